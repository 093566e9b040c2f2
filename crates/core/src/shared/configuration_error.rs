use std::path::PathBuf;

use thiserror::Error;

/// Problems detected before the first frame is processed.
///
/// Every variant is fatal: a run with an invalid configuration never starts.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("frame rate must be a positive integer, got {0} (use --fps to declare one)")]
    InvalidFrameRate(f64),
    #[error("wallpaper count must be at least 1")]
    ZeroCount,
    #[error("score weight '{name}' must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("unsupported output image format '{0}'")]
    UnsupportedFormat(String),
    #[error("cannot open video source {path}: {reason}")]
    UnreadableSource { path: PathBuf, reason: String },
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
