use crate::shared::configuration_error::ConfigurationError;
use crate::shared::frame::Frame;

/// Rates within this distance of an integer are accepted as that integer.
/// Absorbs rational-to-float noise such as `60/2`.
const INTEGRAL_RATE_TOLERANCE: f64 = 1e-6;

/// Derives the sampling stride (frames per nominal second) from a declared rate.
///
/// Only strictly positive integral rates are valid. Fractional rates such as
/// 29.97 are refused rather than rounded, since any rounding silently changes
/// which frames are sampled.
pub fn sampling_stride(fps: f64) -> Result<usize, ConfigurationError> {
    if !fps.is_finite() || fps < 1.0 {
        return Err(ConfigurationError::InvalidFrameRate(fps));
    }
    let rounded = fps.round();
    if (fps - rounded).abs() > INTEGRAL_RATE_TOLERANCE {
        return Err(ConfigurationError::InvalidFrameRate(fps));
    }
    Ok(rounded as usize)
}

/// Forward-only adapter that keeps one frame per `stride` frames.
///
/// A frame is kept when its position in the stream satisfies
/// `position % stride == 0`, counted by the sampler itself. Decode errors are
/// passed through whether or not they fall on a sampled position.
pub struct FrameSampler<I> {
    frames: I,
    stride: usize,
    position: usize,
}

impl<I> FrameSampler<I> {
    pub fn new(frames: I, stride: usize) -> Result<Self, ConfigurationError> {
        if stride == 0 {
            return Err(ConfigurationError::InvalidFrameRate(0.0));
        }
        Ok(Self {
            frames,
            stride,
            position: 0,
        })
    }

    /// Builds a sampler from a declared frame rate.
    pub fn from_fps(frames: I, fps: f64) -> Result<Self, ConfigurationError> {
        Self::new(frames, sampling_stride(fps)?)
    }

    /// Number of source frames pulled so far, sampled or not.
    pub fn frames_read(&self) -> usize {
        self.position
    }
}

impl<I, E> Iterator for FrameSampler<I>
where
    I: Iterator<Item = Result<Frame, E>>,
{
    type Item = Result<Frame, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = self.frames.next()?;
            let position = self.position;
            self.position += 1;
            match item {
                Err(e) => return Some(Err(e)),
                Ok(frame) if position % self.stride == 0 => return Some(Ok(frame)),
                Ok(_) => continue,
            }
        }
    }
}
