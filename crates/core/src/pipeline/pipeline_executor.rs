use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::scoring::domain::beauty_scorer::{BeautyScorer, FrameScore, RejectReason};
use crate::selection::domain::frame_selector::{FrameSelector, Ranking};
use crate::selection::domain::scored_frame::ScoredFrame;
use crate::shared::frame::Frame;
use crate::video::domain::video_reader::VideoReader;

use super::pipeline_error::PipelineError;
use super::pipeline_logger::{ScanLogger, Stage};

/// Progress callback receiving `(sampled, expected)`; returning `false`
/// cancels the current run only. Shared so one callback can serve repeated runs.
pub type ProgressFn = Arc<dyn Fn(usize, usize) -> bool + Send + Sync>;

/// Per-run settings handed to an executor.
pub struct ScanConfig {
    /// Keep one frame out of every `stride` decoded frames.
    pub stride: usize,
    /// Samples the source is expected to yield, 0 when unknown.
    pub expected_samples: usize,
    pub on_progress: Option<ProgressFn>,
    pub cancelled: Arc<AtomicBool>,
}

/// Frame counters of one scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub frames_read: usize,
    pub frames_sampled: usize,
    pub admitted: usize,
    pub rejected_text: usize,
    pub rejected_blurry: usize,
    pub face_failures: usize,
}

impl ScanStats {
    pub fn rejected_by_gate(&self) -> usize {
        self.rejected_text + self.rejected_blurry
    }
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub ranking: Ranking,
    pub stats: ScanStats,
}

/// Abstracts how the decode → sample → score → select pass is run.
///
/// The reader is already open; executors only drain it. Implementations must
/// feed the selector frames in sampling order from a single scoring loop.
pub trait PipelineExecutor: Send {
    fn execute(
        &self,
        reader: &mut dyn VideoReader,
        scorer: &mut BeautyScorer,
        selector: Box<dyn FrameSelector>,
        config: ScanConfig,
        logger: &mut dyn ScanLogger,
    ) -> Result<ScanOutcome, PipelineError>;
}

/// Scoring-side state shared by every executor.
pub(crate) struct ScanState<'a> {
    scorer: &'a mut BeautyScorer,
    selector: Box<dyn FrameSelector>,
    config: ScanConfig,
    stats: ScanStats,
}

impl<'a> ScanState<'a> {
    pub(crate) fn new(
        scorer: &'a mut BeautyScorer,
        selector: Box<dyn FrameSelector>,
        config: ScanConfig,
    ) -> Self {
        Self {
            scorer,
            selector,
            config,
            stats: ScanStats::default(),
        }
    }

    pub(crate) fn stride(&self) -> usize {
        self.config.stride
    }

    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.config.cancelled.clone()
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.config.cancelled.load(Ordering::Relaxed) {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Scores one sampled frame and offers it to the selector if admitted.
    pub(crate) fn consume(
        &mut self,
        frame: Frame,
        logger: &mut dyn ScanLogger,
    ) -> Result<(), PipelineError> {
        self.check_cancelled()?;
        self.stats.frames_sampled += 1;

        let result = self.scorer.score(&frame);
        let timings = self.scorer.last_timings();
        logger.timing(Stage::Gate, timings.gate_ms);

        match result {
            Ok(FrameScore::Scored(score)) => {
                logger.timing(Stage::Faces, timings.faces_ms);
                logger.timing(Stage::Metrics, timings.metrics_ms);
                logger.metric("score", score);
                self.stats.admitted += 1;

                let t = Instant::now();
                self.selector.offer(ScoredFrame::new(frame, score));
                logger.timing(Stage::Select, elapsed_ms(t));
            }
            Ok(FrameScore::Rejected(RejectReason::Text)) => self.stats.rejected_text += 1,
            Ok(FrameScore::Rejected(RejectReason::Blurry)) => self.stats.rejected_blurry += 1,
            Err(e) => {
                logger.timing(Stage::Faces, timings.faces_ms);
                self.stats.face_failures += 1;
                log::warn!("Skipping frame {}: {e}", frame.index());
            }
        }

        let sampled = self.stats.frames_sampled;
        let expected = self.config.expected_samples;
        logger.progress(sampled, expected);
        if let Some(ref cb) = self.config.on_progress {
            // The caller's flag is left alone so the next run starts clean.
            if !cb(sampled, expected) {
                return Err(PipelineError::Cancelled);
            }
        }
        Ok(())
    }

    pub(crate) fn finish(mut self, frames_read: usize, logger: &mut dyn ScanLogger) -> ScanOutcome {
        self.stats.frames_read = frames_read;
        let t = Instant::now();
        let ranking = self.selector.finalize();
        logger.timing(Stage::Select, elapsed_ms(t));
        ScanOutcome {
            ranking,
            stats: self.stats,
        }
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
