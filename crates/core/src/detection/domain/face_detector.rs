use thiserror::Error;

use crate::shared::frame::Frame;

/// Axis-aligned face region in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in square pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A per-frame failure of the face backend.
#[derive(Error, Debug)]
pub enum FaceDetectionError {
    #[error("face inference failed: {0}")]
    Inference(String),
    #[error("unexpected face model output: {0}")]
    Output(String),
}

/// Finds face regions in one frame.
///
/// Implementations hold their loaded model and are reused for every frame,
/// hence `&mut self`. No state may carry over between frames.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, FaceDetectionError>;
}
