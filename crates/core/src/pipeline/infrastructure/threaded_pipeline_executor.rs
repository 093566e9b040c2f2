use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_executor::{
    elapsed_ms, PipelineExecutor, ScanConfig, ScanOutcome, ScanState,
};
use crate::pipeline::pipeline_logger::{ScanLogger, Stage};
use crate::scoring::domain::beauty_scorer::BeautyScorer;
use crate::selection::domain::frame_selector::FrameSelector;
use crate::shared::frame::Frame;
use crate::video::domain::frame_sampler::FrameSampler;
use crate::video::domain::video_reader::VideoReader;

const DEFAULT_CHANNEL_CAPACITY: usize = 4;

/// A sampled frame and the time spent decoding up to it.
type Sample = Result<(Frame, f64), PipelineError>;

/// Decodes and samples on a dedicated reader thread while the calling thread
/// scores.
///
/// Layout: `reader [decode/sample] → main [gate/score/select]`
///
/// Scoring stays on one thread and receives samples in stream order, so the
/// selector sees exactly what the sequential executor would feed it.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        reader: &mut dyn VideoReader,
        scorer: &mut BeautyScorer,
        selector: Box<dyn FrameSelector>,
        config: ScanConfig,
        logger: &mut dyn ScanLogger,
    ) -> Result<ScanOutcome, PipelineError> {
        let mut state = ScanState::new(scorer, selector, config);
        let stride = state.stride();
        let cancelled = state.cancel_flag();
        let (sample_tx, sample_rx) = crossbeam_channel::bounded::<Sample>(self.channel_capacity);

        std::thread::scope(|scope| {
            let reader_handle =
                scope.spawn(move || run_reader(reader, stride, sample_tx, cancelled));

            let loop_result = run_scoring_loop(&mut state, sample_rx, logger);

            let frames_read = match reader_handle.join() {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(loop_result.err().unwrap_or(e)),
                Err(_) => {
                    return Err(loop_result
                        .err()
                        .unwrap_or_else(|| PipelineError::Executor("reader thread panicked".into())))
                }
            };
            loop_result?;
            Ok(frames_read)
        })
        .map(|frames_read| state.finish(frames_read, logger))
    }
}

/// Decodes and samples until the stream ends, the scoring side hangs up or
/// the run is cancelled. Returns the number of frames decoded.
fn run_reader(
    reader: &mut dyn VideoReader,
    stride: usize,
    sample_tx: crossbeam_channel::Sender<Sample>,
    cancelled: Arc<AtomicBool>,
) -> Result<usize, PipelineError> {
    let mut sampler = FrameSampler::new(reader.frames(), stride)?;
    loop {
        if cancelled.load(Ordering::Relaxed) {
            break;
        }
        let t = Instant::now();
        let Some(item) = sampler.next() else {
            break;
        };
        let decode_ms = elapsed_ms(t);
        let sample = item.map(|frame| (frame, decode_ms)).map_err(|e| {
            PipelineError::Source {
                position: sampler.frames_read().saturating_sub(1),
                reason: e.to_string(),
            }
        });
        let failed = sample.is_err();
        if sample_tx.send(sample).is_err() || failed {
            break;
        }
    }
    Ok(sampler.frames_read())
}

/// Consumes samples in order. Dropping `sample_rx` on return unblocks the
/// reader if it is waiting on a full channel.
fn run_scoring_loop(
    state: &mut ScanState<'_>,
    sample_rx: crossbeam_channel::Receiver<Sample>,
    logger: &mut dyn ScanLogger,
) -> Result<(), PipelineError> {
    for sample in sample_rx {
        state.check_cancelled()?;
        let (frame, decode_ms) = sample?;
        logger.timing(Stage::Decode, decode_ms);
        state.consume(frame, logger)?;
    }
    state.check_cancelled()
}
