use std::cmp::Ordering;

use crate::shared::frame::Frame;

/// An admitted frame together with its composite score.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredFrame {
    pub frame: Frame,
    pub score: f64,
}

impl ScoredFrame {
    pub fn new(frame: Frame, score: f64) -> Self {
        Self { frame, score }
    }

    /// Sampling index of the frame in the source, used to break score ties.
    pub fn index(&self) -> usize {
        self.frame.index()
    }
}

/// Ranking order: higher score first, then lower frame index first.
///
/// `Ordering::Less` means `a` ranks ahead of `b`. The order is total, so the
/// result of a sort does not depend on the order frames arrived in.
pub fn rank_order(a: &ScoredFrame, b: &ScoredFrame) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.index().cmp(&b.index()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(index: usize, score: f64) -> ScoredFrame {
        ScoredFrame::new(Frame::new(vec![0; 3], 1, 1, 3, index), score)
    }

    #[test]
    fn test_higher_score_ranks_first() {
        assert_eq!(rank_order(&scored(5, 2.0), &scored(1, 1.0)), Ordering::Less);
    }

    #[test]
    fn test_equal_scores_ranked_by_index() {
        assert_eq!(rank_order(&scored(1, 3.0), &scored(9, 3.0)), Ordering::Less);
        assert_eq!(rank_order(&scored(9, 3.0), &scored(1, 3.0)), Ordering::Greater);
    }
}
