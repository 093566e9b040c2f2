use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::frame_selector::{FrameSelector, Ranking};
use super::scored_frame::{rank_order, ScoredFrame};

/// Keeps at most `K` candidates in a heap whose top is the worst-ranked
/// entry, evicting it whenever a better candidate arrives.
pub struct BoundedTopKSelector {
    k: usize,
    heap: BinaryHeap<WorstFirst>,
    offered: usize,
}

/// Heap entry ordered so the lowest-ranked frame is the maximum.
struct WorstFirst(ScoredFrame);

impl PartialEq for WorstFirst {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for WorstFirst {}

impl PartialOrd for WorstFirst {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorstFirst {
    fn cmp(&self, other: &Self) -> Ordering {
        rank_order(&self.0, &other.0)
    }
}

impl BoundedTopKSelector {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k),
            offered: 0,
        }
    }
}

impl FrameSelector for BoundedTopKSelector {
    fn offer(&mut self, candidate: ScoredFrame) {
        self.offered += 1;
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(WorstFirst(candidate));
            return;
        }
        let beats_worst = self
            .heap
            .peek()
            .is_some_and(|worst| rank_order(&candidate, &worst.0) == Ordering::Less);
        if beats_worst {
            self.heap.pop();
            self.heap.push(WorstFirst(candidate));
        }
    }

    fn offered(&self) -> usize {
        self.offered
    }

    fn finalize(self: Box<Self>) -> Ranking {
        let sorted = self.heap.into_sorted_vec().into_iter().map(|e| e.0).collect();
        Ranking::from_sorted(sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::domain::buffered_top_k_selector::BufferedTopKSelector;
    use crate::shared::frame::Frame;
    use rstest::rstest;

    fn scored(index: usize, score: f64) -> ScoredFrame {
        ScoredFrame::new(Frame::new(vec![index as u8; 3], 1, 1, 3, index), score)
    }

    fn buffered(k: usize) -> Box<dyn FrameSelector> {
        Box::new(BufferedTopKSelector::new(k))
    }

    fn bounded(k: usize) -> Box<dyn FrameSelector> {
        Box::new(BoundedTopKSelector::new(k))
    }

    fn run(mut selector: Box<dyn FrameSelector>, input: &[(usize, f64)]) -> Ranking {
        for &(index, score) in input {
            selector.offer(scored(index, score));
        }
        selector.finalize()
    }

    const SCORES: [(usize, f64); 8] = [
        (0, 3.5),
        (1, 9.0),
        (2, 0.25),
        (3, 7.0),
        (4, 12.0),
        (5, 1.0),
        (6, 4.0),
        (7, 8.5),
    ];

    #[rstest]
    #[case::buffered(buffered(3))]
    #[case::bounded(bounded(3))]
    fn test_k_below_n_keeps_exact_top_k_descending(#[case] selector: Box<dyn FrameSelector>) {
        let ranking = run(selector, &SCORES);
        assert_eq!(ranking.scores(), vec![12.0, 9.0, 8.5]);
        let indices: Vec<_> = ranking.iter().map(|e| e.index()).collect();
        assert_eq!(indices, vec![4, 1, 7]);
    }

    #[rstest]
    #[case::buffered(buffered(20))]
    #[case::bounded(bounded(20))]
    fn test_k_above_n_returns_all_without_padding(#[case] selector: Box<dyn FrameSelector>) {
        let ranking = run(selector, &SCORES);
        assert_eq!(ranking.len(), SCORES.len());
        let scores = ranking.scores();
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
    }

    #[rstest]
    #[case::buffered(buffered(2))]
    #[case::bounded(bounded(2))]
    fn test_empty_stream_gives_empty_ranking(#[case] selector: Box<dyn FrameSelector>) {
        assert!(run(selector, &[]).is_empty());
    }

    #[test]
    fn test_strategies_agree_with_ties_in_any_order() {
        let input = [(3, 5.0), (1, 5.0), (8, 2.0), (2, 5.0), (6, 7.0), (0, 2.0)];
        let mut reversed = input;
        reversed.reverse();

        for k in 1..=input.len() {
            let reference = run(buffered(k), &input);
            assert_eq!(run(bounded(k), &input), reference, "k = {k}");
            assert_eq!(run(buffered(k), &reversed), reference, "k = {k}");
            assert_eq!(run(bounded(k), &reversed), reference, "k = {k}");
        }

        let top3: Vec<_> = run(bounded(3), &input).iter().map(|e| e.index()).collect();
        assert_eq!(top3, vec![6, 1, 2]);
    }

    #[test]
    fn test_offered_counts_every_candidate() {
        let mut selector = BoundedTopKSelector::new(1);
        for &(index, score) in &SCORES {
            selector.offer(scored(index, score));
        }
        assert_eq!(selector.offered(), SCORES.len());
        assert_eq!(selector.heap.len(), 1);
    }
}
