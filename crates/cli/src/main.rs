use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use wallpaper_core::detection::domain::face_detector::FaceDetector;
use wallpaper_core::detection::domain::text_detector::TextDetector;
use wallpaper_core::detection::infrastructure::onnx_face_detector::{
    DetectionParams, OnnxFaceDetector, DEFAULT_CONFIDENCE,
};
use wallpaper_core::pipeline::extract_wallpapers_use_case::{
    ExtractWallpapersUseCase, ExtractionConfig, ExtractionReport, SelectionStrategy,
};
use wallpaper_core::pipeline::infrastructure::sequential_pipeline_executor::SequentialPipelineExecutor;
use wallpaper_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use wallpaper_core::pipeline::pipeline_executor::{PipelineExecutor, ProgressFn};
use wallpaper_core::pipeline::pipeline_logger::StdoutScanLogger;
use wallpaper_core::scoring::domain::beauty_scorer::ScoreWeights;
use wallpaper_core::shared::constants::{
    DEFAULT_OUTPUT_DIR, DEFAULT_WALLPAPER_COUNT, FACE_MODEL_NAME, FACE_MODEL_URL,
    OUTPUT_EXTENSIONS,
};
use wallpaper_core::shared::model_resolver::{self, ModelSource};
use wallpaper_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use wallpaper_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Extract the most wallpaper-worthy frames from a video.
#[derive(Parser)]
#[command(name = "wallpaper-bot")]
struct Cli {
    /// Input video file.
    input: PathBuf,

    /// Directory the wallpapers are written to (created if missing).
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Number of wallpapers to keep.
    #[arg(long, default_value_t = DEFAULT_WALLPAPER_COUNT)]
    count: usize,

    /// Integer frame rate to sample with, overriding the one the file declares.
    #[arg(long)]
    fps: Option<u32>,

    /// Output image format: png, jpg, bmp or webp.
    #[arg(long, default_value = "png")]
    format: String,

    /// Weight of the large-face count.
    #[arg(long, default_value = "0.5")]
    w_faces: f64,

    /// Weight of the hue variance.
    #[arg(long, default_value = "0.3")]
    w_color: f64,

    /// Weight of the edge density.
    #[arg(long, default_value = "0.1")]
    w_edge: f64,

    /// Weight of the mirror symmetry.
    #[arg(long, default_value = "0.1")]
    w_symmetry: f64,

    /// ONNX face model file. Without it the model must already be in the user cache.
    #[arg(long)]
    face_model: Option<PathBuf>,

    /// Allow a one-time download of the default face model into the user cache.
    #[arg(long)]
    download_model: bool,

    /// Minimum confidence of raw face candidates (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    face_confidence: f64,

    /// Tesseract data directory (system default if omitted).
    #[cfg(feature = "ocr")]
    #[arg(long)]
    tessdata: Option<PathBuf>,

    /// Keep only the best `count` frames in memory while scanning.
    #[arg(long)]
    bounded: bool,

    /// Decode on a separate thread while frames are scored.
    #[arg(long)]
    threaded: bool,

    /// Write a JSON run report to this file.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunReport {
    input: PathBuf,
    fps: f64,
    stride: usize,
    frames_read: usize,
    frames_sampled: usize,
    admitted: usize,
    rejected_by_gate: usize,
    skipped_face_failures: usize,
    wallpapers: Vec<WallpaperEntry>,
    failed_writes: Vec<FailedWrite>,
}

#[derive(Serialize)]
struct WallpaperEntry {
    rank: usize,
    score: f64,
    frame: usize,
    path: PathBuf,
}

#[derive(Serialize)]
struct FailedWrite {
    rank: usize,
    score: f64,
    path: PathBuf,
    reason: String,
}

impl RunReport {
    fn new(input: &Path, report: &ExtractionReport) -> Self {
        Self {
            input: input.to_path_buf(),
            fps: report.metadata.fps,
            stride: report.stride,
            frames_read: report.stats.frames_read,
            frames_sampled: report.stats.frames_sampled,
            admitted: report.stats.admitted,
            rejected_by_gate: report.stats.rejected_by_gate(),
            skipped_face_failures: report.stats.face_failures,
            wallpapers: report
                .saved
                .iter()
                .map(|s| WallpaperEntry {
                    rank: s.rank,
                    score: s.score,
                    frame: s.frame.index(),
                    path: s.path.clone(),
                })
                .collect(),
            failed_writes: report
                .failed
                .iter()
                .map(|f| FailedWrite {
                    rank: f.rank,
                    score: f.score,
                    path: f.path.clone(),
                    reason: f.reason.clone(),
                })
                .collect(),
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = extraction_config(&cli);
    let face_detector = build_face_detector(&cli)?;
    let text_detector = build_text_detector(&cli)?;
    let executor: Box<dyn PipelineExecutor> = if cli.threaded {
        Box::new(ThreadedPipelineExecutor::new())
    } else {
        Box::new(SequentialPipelineExecutor::new())
    };

    let progress: ProgressFn = Arc::new(|sampled, expected| {
        if expected > 0 {
            eprint!("\rScoring sample {sampled}/{expected}");
        } else {
            eprint!("\rScoring sample {sampled}");
        }
        true
    });

    let mut use_case = ExtractWallpapersUseCase::new(
        Box::new(FfmpegReader::new()),
        text_detector,
        face_detector,
        Box::new(ImageFileWriter::new()),
        executor,
        config,
        Some(progress),
        None,
    )?;

    let mut logger = StdoutScanLogger::default();
    let report = use_case.execute(&cli.input, &mut logger)?;
    eprintln!();

    for saved in &report.saved {
        println!("{}", saved.path.display());
    }
    log::info!(
        "Saved {} wallpapers to {}",
        report.saved.len(),
        cli.output_dir.display()
    );

    if let Some(ref path) = cli.report {
        let json = serde_json::to_string_pretty(&RunReport::new(&cli.input, &report))?;
        std::fs::write(path, json)?;
        log::info!("Report written to {}", path.display());
    }

    if !report.failed.is_empty() {
        return Err(format!("{} wallpapers could not be written", report.failed.len()).into());
    }
    Ok(())
}

fn extraction_config(cli: &Cli) -> ExtractionConfig {
    ExtractionConfig {
        count: cli.count,
        output_dir: cli.output_dir.clone(),
        extension: cli.format.to_lowercase(),
        weights: ScoreWeights {
            faces: cli.w_faces,
            color: cli.w_color,
            edge: cli.w_edge,
            symmetry: cli.w_symmetry,
        },
        fps_override: cli.fps.map(f64::from),
        strategy: if cli.bounded {
            SelectionStrategy::Bounded
        } else {
            SelectionStrategy::Buffered
        },
    }
}

fn build_face_detector(cli: &Cli) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {FACE_MODEL_NAME}");
    let source = ModelSource {
        name: FACE_MODEL_NAME,
        url: FACE_MODEL_URL,
        explicit: cli.face_model.as_deref(),
        allow_download: cli.download_model,
    };
    let model_path = model_resolver::resolve(&source, Some(Box::new(download_progress)))?;

    let params = DetectionParams {
        confidence: cli.face_confidence,
        ..DetectionParams::default()
    };
    Ok(Box::new(OnnxFaceDetector::new(&model_path, params)?))
}

#[cfg(feature = "ocr")]
fn build_text_detector(cli: &Cli) -> Result<Box<dyn TextDetector>, Box<dyn std::error::Error>> {
    use wallpaper_core::detection::infrastructure::tesseract_text_detector::TesseractTextDetector;

    Ok(Box::new(TesseractTextDetector::new(cli.tessdata.as_deref())?))
}

#[cfg(not(feature = "ocr"))]
fn build_text_detector(_cli: &Cli) -> Result<Box<dyn TextDetector>, Box<dyn std::error::Error>> {
    use wallpaper_core::detection::infrastructure::no_text_detector::NoTextDetector;

    Ok(Box::new(NoTextDetector::new()))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if cli.count == 0 {
        return Err("Count must be at least 1".into());
    }
    if cli.fps == Some(0) {
        return Err("Frame rate override must be a positive integer".into());
    }
    if !OUTPUT_EXTENSIONS.contains(&cli.format.to_lowercase().as_str()) {
        return Err(format!(
            "Format must be one of: {}, got '{}'",
            OUTPUT_EXTENSIONS.join(", "),
            cli.format
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.face_confidence) {
        return Err(format!(
            "Face confidence must be between 0.0 and 1.0, got {}",
            cli.face_confidence
        )
        .into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
