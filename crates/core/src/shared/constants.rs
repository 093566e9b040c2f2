pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Frames whose Laplacian variance falls below this are treated as blurry.
pub const SHARPNESS_FLOOR: f64 = 100.0;

/// Faces larger than this many square pixels count towards the score.
pub const LARGE_FACE_AREA: u64 = 50_000;

/// Canny hysteresis thresholds on the L1 Sobel gradient magnitude.
pub const CANNY_LOW_THRESHOLD: i32 = 100;
pub const CANNY_HIGH_THRESHOLD: i32 = 200;

/// Image pyramid step between face detection scales.
pub const FACE_SCALE_FACTOR: f64 = 1.1;

/// Overlapping raw detections a face candidate needs besides itself to be reported.
pub const FACE_MIN_NEIGHBORS: usize = 5;

pub const DEFAULT_WALLPAPER_COUNT: usize = 10;
pub const DEFAULT_OUTPUT_DIR: &str = "wallpapers";
pub const WALLPAPER_FILE_PREFIX: &str = "wallpaper_";

pub const OUTPUT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];
