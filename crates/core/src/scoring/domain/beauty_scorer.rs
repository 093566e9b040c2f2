use std::time::Instant;

use crate::detection::domain::face_detector::FaceDetectionError;
use crate::shared::configuration_error::ConfigurationError;
use crate::shared::frame::Frame;

use super::content_gate::{ContentGate, GateVerdict};
use super::face_signal::FaceSignal;
use super::feature_metrics::FeatureVector;

/// Linear weights of the composite score.
///
/// The metrics are combined unnormalized, so hue variance (often in the
/// thousands) dominates unless its weight is re-derived.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreWeights {
    pub faces: f64,
    pub color: f64,
    pub edge: f64,
    pub symmetry: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            faces: 0.5,
            color: 0.3,
            edge: 0.1,
            symmetry: 0.1,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("faces", self.faces),
            ("color", self.color),
            ("edge", self.edge),
            ("symmetry", self.symmetry),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }

    pub fn combine(&self, large_faces: usize, features: &FeatureVector) -> f64 {
        self.faces * large_faces as f64
            + self.color * features.color_variance
            + self.edge * features.edge_density
            + self.symmetry * features.symmetry
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    Text,
    Blurry,
}

/// A frame's score, or the reason it was excluded from the candidate pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameScore {
    Rejected(RejectReason),
    Scored(f64),
}

impl FrameScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            FrameScore::Scored(score) => Some(*score),
            FrameScore::Rejected(_) => None,
        }
    }
}

/// Wall-clock milliseconds spent in each scoring step of the last frame.
/// Steps that did not run are 0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimings {
    pub gate_ms: f64,
    pub faces_ms: f64,
    pub metrics_ms: f64,
}

/// Gates a frame, then combines large faces and the visual metrics.
pub struct BeautyScorer {
    gate: ContentGate,
    faces: FaceSignal,
    weights: ScoreWeights,
    last_timings: StageTimings,
}

impl BeautyScorer {
    pub fn new(gate: ContentGate, faces: FaceSignal, weights: ScoreWeights) -> Self {
        Self {
            gate,
            faces,
            weights,
            last_timings: StageTimings::default(),
        }
    }

    pub fn last_timings(&self) -> StageTimings {
        self.last_timings
    }

    /// Face detection failures are returned to the caller; there is no safe
    /// default face count.
    pub fn score(&mut self, frame: &Frame) -> Result<FrameScore, FaceDetectionError> {
        self.last_timings = StageTimings::default();

        let t = Instant::now();
        let verdict = self.gate.evaluate(frame);
        self.last_timings.gate_ms = elapsed_ms(t);
        let sharpness = match verdict {
            GateVerdict::Admitted { sharpness } => sharpness,
            GateVerdict::RejectedText => return Ok(FrameScore::Rejected(RejectReason::Text)),
            GateVerdict::RejectedBlurry { .. } => {
                return Ok(FrameScore::Rejected(RejectReason::Blurry))
            }
        };

        let t = Instant::now();
        let faces = self.faces.detect(frame);
        self.last_timings.faces_ms = elapsed_ms(t);
        let large_faces = faces?.large_faces();

        let t = Instant::now();
        let features = FeatureVector::with_sharpness(frame, sharpness);
        self.last_timings.metrics_ms = elapsed_ms(t);

        Ok(FrameScore::Scored(self.weights.combine(large_faces, &features)))
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
