use super::scored_frame::ScoredFrame;

/// Accumulates scored frames and yields the best `K` once the stream ends.
///
/// `finalize` consumes the selector, so nothing can be offered after the
/// ranking is produced. Dropping an unfinalized selector discards its
/// partial state.
pub trait FrameSelector: Send {
    fn offer(&mut self, candidate: ScoredFrame);

    /// Frames offered so far.
    fn offered(&self) -> usize;

    fn finalize(self: Box<Self>) -> Ranking;
}

/// The final top-K, best first. Read-only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ranking {
    entries: Vec<ScoredFrame>,
}

impl Ranking {
    pub(crate) fn from_sorted(entries: Vec<ScoredFrame>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredFrame> {
        self.entries.iter()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.score).collect()
    }

    pub fn into_entries(self) -> Vec<ScoredFrame> {
        self.entries
    }
}
