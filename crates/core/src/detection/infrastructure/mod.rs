pub mod candidate_grouping;
pub mod no_text_detector;
pub mod onnx_face_detector;
#[cfg(feature = "ocr")]
pub mod tesseract_text_detector;
