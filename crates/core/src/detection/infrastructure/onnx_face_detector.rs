/// YOLO face detector using ONNX Runtime via `ort`.
///
/// The frame is evaluated over a small image pyramid, each level shrinking by
/// the configured scale factor. Raw candidates from every level are pooled and
/// grouped by overlap; only faces backed by enough neighbouring candidates are
/// reported.
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::domain::face_detector::{FaceBox, FaceDetectionError, FaceDetector};
use crate::shared::constants::{FACE_MIN_NEIGHBORS, FACE_SCALE_FACTOR};
use crate::shared::frame::Frame;

use super::candidate_grouping::{group_candidates, Candidate, GROUPING_IOU_THRESHOLD};

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default minimum candidate confidence.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// Pyramid levels evaluated per frame, the first at full scale.
pub const DEFAULT_PYRAMID_LEVELS: usize = 3;

/// Letterbox fill value (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

#[derive(Error, Debug)]
pub enum FaceDetectorInitError {
    #[error("failed to load face model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },
    #[error("invalid face detector parameters: {0}")]
    InvalidParameters(String),
}

/// Detection parameters fixed for the lifetime of the detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionParams {
    pub confidence: f64,
    pub scale_factor: f64,
    pub min_neighbors: usize,
    pub pyramid_levels: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            scale_factor: FACE_SCALE_FACTOR,
            min_neighbors: FACE_MIN_NEIGHBORS,
            pyramid_levels: DEFAULT_PYRAMID_LEVELS,
        }
    }
}

impl DetectionParams {
    fn validate(&self) -> Result<(), FaceDetectorInitError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(FaceDetectorInitError::InvalidParameters(format!(
                "confidence must be within 0.0-1.0, got {}",
                self.confidence
            )));
        }
        if !(self.scale_factor > 1.0 && self.scale_factor.is_finite()) {
            return Err(FaceDetectorInitError::InvalidParameters(format!(
                "scale factor must be greater than 1.0, got {}",
                self.scale_factor
            )));
        }
        if self.pyramid_levels == 0 {
            return Err(FaceDetectorInitError::InvalidParameters(
                "at least one pyramid level is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Relative image scale of pyramid level `level`.
    fn level_scale(&self, level: usize) -> f64 {
        self.scale_factor.powi(-(level as i32))
    }
}

fn model_load_error(path: &Path, e: impl std::fmt::Display) -> FaceDetectorInitError {
    FaceDetectorInitError::ModelLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Face detector backed by an ONNX Runtime session, loaded once.
pub struct OnnxFaceDetector {
    session: ort::session::Session,
    params: DetectionParams,
    input_size: u32,
}

impl OnnxFaceDetector {
    /// Load a YOLO face model and prepare for inference.
    ///
    /// The input resolution is read from the model's NCHW input shape,
    /// falling back to 640 when the shape is dynamic.
    pub fn new(model_path: &Path, params: DetectionParams) -> Result<Self, FaceDetectorInitError> {
        params.validate()?;
        let session = ort::session::Session::builder()
            .map_err(|e| model_load_error(model_path, e))?
            .commit_from_file(model_path)
            .map_err(|e| model_load_error(model_path, e))?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!(
            "Loaded face model {} (input {input_size}px, {} pyramid levels)",
            model_path.display(),
            params.pyramid_levels
        );

        Ok(Self {
            session,
            params,
            input_size,
        })
    }

    fn detect_level(
        &mut self,
        frame: &Frame,
        level_scale: f64,
    ) -> Result<Vec<Candidate>, FaceDetectionError> {
        let lb = letterbox(frame, self.input_size, level_scale);

        let input_value = ort::value::Tensor::from_array(lb.tensor)
            .map_err(|e| FaceDetectionError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| FaceDetectionError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(FaceDetectionError::Output("model produced no outputs".into()));
        }
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| FaceDetectionError::Output(e.to_string()))?;
        let shape = tensor.shape().to_vec();
        let data = tensor
            .as_slice()
            .ok_or_else(|| FaceDetectionError::Output("non-contiguous output tensor".into()))?;

        parse_candidates(data, &shape, self.params.confidence, &lb)
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, FaceDetectionError> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }
        if frame.channels() < 3 {
            return Err(FaceDetectionError::Inference(format!(
                "expected an RGB frame, got {} channels",
                frame.channels()
            )));
        }
        let mut candidates = Vec::new();
        for level in 0..self.params.pyramid_levels {
            let scale = self.params.level_scale(level);
            candidates.extend(self.detect_level(frame, scale)?);
        }
        Ok(group_candidates(
            &candidates,
            self.params.min_neighbors,
            GROUPING_IOU_THRESHOLD,
            frame.width(),
            frame.height(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Pre/post-processing
// ---------------------------------------------------------------------------

struct Letterbox {
    tensor: ndarray::Array4<f32>,
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

/// Resizes the frame by `level_scale` on top of the fit-to-input scale and
/// pads it into a `target_size`² NCHW tensor.
fn letterbox(frame: &Frame, target_size: u32, level_scale: f64) -> Letterbox {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh) * level_scale;
    let new_w = ((fw * scale).round() as u32).clamp(1, target_size);
    let new_h = ((fh * scale).round() as u32).clamp(1, target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let mut tensor = ndarray::Array4::<f32>::from_elem(
        (1, 3, target_size as usize, target_size as usize),
        PAD_VALUE,
    );

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbour resample into the padded region.
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    Letterbox {
        tensor,
        scale,
        pad_x,
        pad_y,
    }
}

/// Reads `[cx, cy, w, h, conf, ...]` rows from a `[1, feats, dets]` or
/// `[1, dets, feats]` output and maps them back to frame coordinates.
fn parse_candidates(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    lb: &Letterbox,
) -> Result<Vec<Candidate>, FaceDetectionError> {
    if shape.len() != 3 {
        return Err(FaceDetectionError::Output(format!(
            "unexpected output shape {shape:?}"
        )));
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 || data.len() < num_dets * num_feats {
        return Err(FaceDetectionError::Output(format!(
            "output shape {shape:?} does not carry box and confidence"
        )));
    }

    let value = |det: usize, feat: usize| -> f64 {
        let i = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[i] as f64
    };

    let (pad_x, pad_y) = (lb.pad_x as f64, lb.pad_y as f64);
    let candidates = (0..num_dets)
        .filter(|&d| value(d, 4) >= confidence)
        .map(|d| {
            let (cx, cy, w, h) = (value(d, 0), value(d, 1), value(d, 2), value(d, 3));
            Candidate {
                x1: (cx - w / 2.0 - pad_x) / lb.scale,
                y1: (cy - h / 2.0 - pad_y) / lb.scale,
                x2: (cx + w / 2.0 - pad_x) / lb.scale,
                y2: (cy + h / 2.0 - pad_y) / lb.scale,
                confidence: value(d, 4),
            }
        })
        .collect();
    Ok(candidates)
}
