use super::frame_selector::{FrameSelector, Ranking};
use super::scored_frame::{rank_order, ScoredFrame};

/// Holds every candidate until the stream ends, then sorts and truncates.
///
/// Peak memory grows with the number of admitted frames.
pub struct BufferedTopKSelector {
    k: usize,
    buffer: Vec<ScoredFrame>,
}

impl BufferedTopKSelector {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            buffer: Vec::new(),
        }
    }
}

impl FrameSelector for BufferedTopKSelector {
    fn offer(&mut self, candidate: ScoredFrame) {
        self.buffer.push(candidate);
    }

    fn offered(&self) -> usize {
        self.buffer.len()
    }

    fn finalize(mut self: Box<Self>) -> Ranking {
        self.buffer.sort_by(rank_order);
        self.buffer.truncate(self.k);
        Ranking::from_sorted(self.buffer)
    }
}
