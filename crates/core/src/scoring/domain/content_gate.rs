use crate::detection::domain::text_detector::TextDetector;
use crate::shared::constants::SHARPNESS_FLOOR;
use crate::shared::frame::Frame;

use super::feature_metrics::sharpness;

/// Outcome of the admissibility check for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GateVerdict {
    Admitted { sharpness: f64 },
    RejectedText,
    RejectedBlurry { sharpness: f64 },
}

impl GateVerdict {
    pub fn is_admitted(&self) -> bool {
        matches!(self, GateVerdict::Admitted { .. })
    }
}

/// Excludes frames that carry visible text or fall below the sharpness floor.
///
/// OCR errors on a frame are treated as "no text": only
/// [`TextDetectionError`](crate::detection::domain::text_detector::TextDetectionError)
/// reaches this point, startup failures are reported by the backend itself.
pub struct ContentGate {
    text_detector: Box<dyn TextDetector>,
    sharpness_floor: f64,
}

impl ContentGate {
    pub fn new(text_detector: Box<dyn TextDetector>) -> Self {
        Self {
            text_detector,
            sharpness_floor: SHARPNESS_FLOOR,
        }
    }

    pub fn admit(&mut self, frame: &Frame) -> bool {
        self.evaluate(frame).is_admitted()
    }

    pub fn evaluate(&mut self, frame: &Frame) -> GateVerdict {
        if self.has_text(frame) {
            return GateVerdict::RejectedText;
        }
        let sharpness = sharpness(frame);
        if sharpness < self.sharpness_floor {
            GateVerdict::RejectedBlurry { sharpness }
        } else {
            GateVerdict::Admitted { sharpness }
        }
    }

    fn has_text(&mut self, frame: &Frame) -> bool {
        match self.text_detector.recognize(frame) {
            Ok(text) => !text.trim().is_empty(),
            Err(e) => {
                log::debug!("OCR failed on frame {}, assuming no text: {e}", frame.index());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::text_detector::TextDetectionError;
    use rstest::rstest;

    struct FixedText(&'static str);

    impl TextDetector for FixedText {
        fn recognize(&mut self, _frame: &Frame) -> Result<String, TextDetectionError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingText;

    impl TextDetector for FailingText {
        fn recognize(&mut self, _frame: &Frame) -> Result<String, TextDetectionError> {
            Err(TextDetectionError::Recognition("engine hiccup".into()))
        }
    }

    fn flat_frame() -> Frame {
        Frame::new(vec![90; 16 * 16 * 3], 16, 16, 3, 0)
    }

    /// Alternating black and white columns, far above the floor.
    fn sharp_frame() -> Frame {
        let (w, h) = (16u32, 16u32);
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for _y in 0..h {
            for x in 0..w {
                let v = if x % 2 == 0 { 0 } else { 255 };
                data.extend_from_slice(&[v, v, v]);
            }
        }
        Frame::new(data, w, h, 3, 0)
    }

    #[rstest]
    #[case::subtitle("THE END")]
    #[case::padded("  credits \n")]
    fn test_rejects_text_regardless_of_sharpness(#[case] text: &'static str) {
        let mut gate = ContentGate::new(Box::new(FixedText(text)));
        assert_eq!(gate.evaluate(&sharp_frame()), GateVerdict::RejectedText);
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace(" \n\t ")]
    fn test_whitespace_counts_as_no_text(#[case] text: &'static str) {
        let mut gate = ContentGate::new(Box::new(FixedText(text)));
        assert!(gate.admit(&sharp_frame()));
    }

    #[test]
    fn test_rejects_blurry_frame_without_text() {
        let mut gate = ContentGate::new(Box::new(FixedText("")));
        assert_eq!(
            gate.evaluate(&flat_frame()),
            GateVerdict::RejectedBlurry { sharpness: 0.0 }
        );
    }

    #[test]
    fn test_ocr_failure_fails_open() {
        let mut gate = ContentGate::new(Box::new(FailingText));
        assert!(gate.admit(&sharp_frame()));
        assert!(!gate.admit(&flat_frame()));
    }

    #[test]
    fn test_admitted_verdict_carries_sharpness() {
        let mut gate = ContentGate::new(Box::new(FixedText("")));
        match gate.evaluate(&sharp_frame()) {
            GateVerdict::Admitted { sharpness } => assert!(sharpness >= SHARPNESS_FLOOR),
            other => panic!("expected admission, got {other:?}"),
        }
    }
}
