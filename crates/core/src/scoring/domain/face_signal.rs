use crate::detection::domain::face_detector::{FaceDetectionError, FaceDetector};
use crate::shared::constants::LARGE_FACE_AREA;
use crate::shared::frame::Frame;

/// Face count and per-face pixel areas for one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FaceObservation {
    pub count: usize,
    pub sizes: Vec<u64>,
}

impl FaceObservation {
    pub fn large_faces(&self) -> usize {
        large_face_count(&self.sizes)
    }
}

/// Number of faces whose area exceeds [`LARGE_FACE_AREA`].
pub fn large_face_count(sizes: &[u64]) -> usize {
    sizes.iter().filter(|&&size| size > LARGE_FACE_AREA).count()
}

/// Subject-prominence signal backed by a face detector loaded once.
pub struct FaceSignal {
    detector: Box<dyn FaceDetector>,
}

impl FaceSignal {
    pub fn new(detector: Box<dyn FaceDetector>) -> Self {
        Self { detector }
    }

    pub fn detect(&mut self, frame: &Frame) -> Result<FaceObservation, FaceDetectionError> {
        let faces = self.detector.detect(frame)?;
        Ok(FaceObservation {
            count: faces.len(),
            sizes: faces.iter().map(|f| f.area()).collect(),
        })
    }
}
