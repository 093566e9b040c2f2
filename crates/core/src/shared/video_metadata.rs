use std::path::PathBuf;

/// Properties of an opened video source, as reported by the decoder.
///
/// `fps` is the declared nominal rate and may be fractional (e.g. NTSC
/// 30000/1001). The sampler refuses non-integral rates; see
/// [`crate::video::domain::frame_sampler::sampling_stride`].
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Returns a copy with the declared frame rate replaced.
    pub fn with_fps(&self, fps: f64) -> Self {
        Self {
            fps,
            ..self.clone()
        }
    }

    /// Video length in seconds, or `None` when the rate or frame count is unknown.
    pub fn duration_secs(&self) -> Option<f64> {
        if self.fps > 0.0 && self.total_frames > 0 {
            Some(self.total_frames as f64 / self.fps)
        } else {
            None
        }
    }
}
