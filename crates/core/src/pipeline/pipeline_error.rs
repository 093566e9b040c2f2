use thiserror::Error;

use crate::shared::configuration_error::ConfigurationError;

/// Ways an extraction run can end without a ranking.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("video decoding failed at frame {position}: {reason}")]
    Source { position: usize, reason: String },
    #[error("extraction cancelled")]
    Cancelled,
    #[error("pipeline worker failed: {0}")]
    Executor(String),
}
