use thiserror::Error;

use crate::shared::frame::Frame;

/// A per-frame OCR failure.
///
/// This is the only error type the content gate absorbs; backend
/// misconfiguration is reported by the backend's constructor instead.
#[derive(Error, Debug)]
pub enum TextDetectionError {
    #[error("frame has no pixels")]
    EmptyImage,
    #[error("could not hand frame to OCR engine: {0}")]
    ImageSetup(String),
    #[error("text recognition failed: {0}")]
    Recognition(String),
}

/// Recognizes printed text (subtitles, credits, signage) in a frame.
pub trait TextDetector: Send {
    /// Returns the raw recognized text, possibly only whitespace.
    fn recognize(&mut self, frame: &Frame) -> Result<String, TextDetectionError>;
}
