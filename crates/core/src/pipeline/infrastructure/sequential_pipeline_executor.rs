use std::time::Instant;

use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_executor::{
    elapsed_ms, PipelineExecutor, ScanConfig, ScanOutcome, ScanState,
};
use crate::pipeline::pipeline_logger::{ScanLogger, Stage};
use crate::scoring::domain::beauty_scorer::BeautyScorer;
use crate::selection::domain::frame_selector::FrameSelector;
use crate::video::domain::frame_sampler::FrameSampler;
use crate::video::domain::video_reader::VideoReader;

/// Runs the whole scan on the calling thread: the next frame is decoded only
/// after the previous sample has been scored and offered.
#[derive(Debug, Default)]
pub struct SequentialPipelineExecutor;

impl SequentialPipelineExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineExecutor for SequentialPipelineExecutor {
    fn execute(
        &self,
        reader: &mut dyn VideoReader,
        scorer: &mut BeautyScorer,
        selector: Box<dyn FrameSelector>,
        config: ScanConfig,
        logger: &mut dyn ScanLogger,
    ) -> Result<ScanOutcome, PipelineError> {
        let mut state = ScanState::new(scorer, selector, config);
        let mut sampler = FrameSampler::new(reader.frames(), state.stride())?;

        loop {
            state.check_cancelled()?;
            let t = Instant::now();
            let Some(item) = sampler.next() else {
                break;
            };
            logger.timing(Stage::Decode, elapsed_ms(t));

            let frame = item.map_err(|e| PipelineError::Source {
                position: sampler.frames_read().saturating_sub(1),
                reason: e.to_string(),
            })?;
            state.consume(frame, logger)?;
        }

        let frames_read = sampler.frames_read();
        Ok(state.finish(frames_read, logger))
    }
}
