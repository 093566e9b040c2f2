//! Tesseract OCR backend via `leptess`, built with the `ocr` feature.

use std::io::Cursor;
use std::path::Path;

use thiserror::Error;

use crate::detection::domain::text_detector::{TextDetectionError, TextDetector};
use crate::shared::frame::Frame;

const DEFAULT_LANGUAGE: &str = "eng";

#[derive(Error, Debug)]
pub enum TextDetectorInitError {
    #[error("failed to initialise Tesseract ({language}) from {tessdata}: {reason}")]
    Init {
        tessdata: String,
        language: String,
        reason: String,
    },
}

/// Recognizes text with a single Tesseract handle reused across frames.
pub struct TesseractTextDetector {
    engine: leptess::LepTess,
}

// The handle is owned by one scoring loop and never shared.
unsafe impl Send for TesseractTextDetector {}

impl TesseractTextDetector {
    /// `tessdata` of `None` uses the system's default data directory.
    pub fn new(tessdata: Option<&Path>) -> Result<Self, TextDetectorInitError> {
        Self::with_language(tessdata, DEFAULT_LANGUAGE)
    }

    pub fn with_language(
        tessdata: Option<&Path>,
        language: &str,
    ) -> Result<Self, TextDetectorInitError> {
        let data_path = tessdata.map(|p| p.to_string_lossy().into_owned());
        let engine = leptess::LepTess::new(data_path.as_deref(), language).map_err(|e| {
            TextDetectorInitError::Init {
                tessdata: data_path.clone().unwrap_or_else(|| "default path".to_string()),
                language: language.to_string(),
                reason: e.to_string(),
            }
        })?;
        log::debug!("Tesseract initialised for '{language}'");
        Ok(Self { engine })
    }
}

/// Encodes an RGB frame as PNG, the in-memory form Leptonica reads.
fn encode_png(frame: &Frame) -> Result<Vec<u8>, TextDetectionError> {
    if frame.is_empty() {
        return Err(TextDetectionError::EmptyImage);
    }
    let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or_else(|| {
            TextDetectionError::ImageSetup(format!(
                "{} bytes do not form a {}x{} RGB image",
                frame.data().len(),
                frame.width(),
                frame.height()
            ))
        })?;
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .map_err(|e| TextDetectionError::ImageSetup(e.to_string()))?;
    Ok(bytes.into_inner())
}

impl TextDetector for TesseractTextDetector {
    fn recognize(&mut self, frame: &Frame) -> Result<String, TextDetectionError> {
        let png = encode_png(frame)?;
        self.engine
            .set_image_from_mem(&png)
            .map_err(|e| TextDetectionError::ImageSetup(e.to_string()))?;
        self.engine
            .get_utf8_text()
            .map_err(|e| TextDetectionError::Recognition(e.to_string()))
    }
}
