use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::text_detector::TextDetector;
use crate::scoring::domain::beauty_scorer::{BeautyScorer, ScoreWeights};
use crate::scoring::domain::content_gate::ContentGate;
use crate::scoring::domain::face_signal::FaceSignal;
use crate::selection::domain::bounded_top_k_selector::BoundedTopKSelector;
use crate::selection::domain::buffered_top_k_selector::BufferedTopKSelector;
use crate::selection::domain::frame_selector::FrameSelector;
use crate::shared::configuration_error::ConfigurationError;
use crate::shared::constants::{DEFAULT_OUTPUT_DIR, DEFAULT_WALLPAPER_COUNT, OUTPUT_EXTENSIONS};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_sampler::sampling_stride;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;

use super::pipeline_error::PipelineError;
use super::pipeline_executor::{PipelineExecutor, ProgressFn, ScanConfig, ScanStats};
use super::pipeline_logger::ScanLogger;
use super::wallpaper_saver::{SavedWallpaper, WallpaperSaver, WriteFailure};

/// How the top-K set is held while the stream is scanned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Keep every admitted frame and sort once at the end.
    #[default]
    Buffered,
    /// Keep at most K frames in a heap.
    Bounded,
}

impl SelectionStrategy {
    fn selector(self, k: usize) -> Box<dyn FrameSelector> {
        match self {
            SelectionStrategy::Buffered => Box::new(BufferedTopKSelector::new(k)),
            SelectionStrategy::Bounded => Box::new(BoundedTopKSelector::new(k)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionConfig {
    pub count: usize,
    pub output_dir: PathBuf,
    /// Image file extension; also selects the encoder.
    pub extension: String,
    pub weights: ScoreWeights,
    /// Replaces the frame rate declared by the source.
    pub fps_override: Option<f64>,
    pub strategy: SelectionStrategy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_WALLPAPER_COUNT,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            extension: "png".to_string(),
            weights: ScoreWeights::default(),
            fps_override: None,
            strategy: SelectionStrategy::default(),
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.count == 0 {
            return Err(ConfigurationError::ZeroCount);
        }
        self.weights.validate()?;
        if !OUTPUT_EXTENSIONS.contains(&self.extension.as_str()) {
            return Err(ConfigurationError::UnsupportedFormat(self.extension.clone()));
        }
        if let Some(fps) = self.fps_override {
            sampling_stride(fps)?;
        }
        Ok(())
    }
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct ExtractionReport {
    pub metadata: VideoMetadata,
    pub stride: usize,
    /// Written wallpapers, best first.
    pub saved: Vec<SavedWallpaper>,
    pub failed: Vec<WriteFailure>,
    pub stats: ScanStats,
}

/// Scans a video and writes its best frames as wallpapers.
///
/// Detectors are loaded by the caller and reused across frames and across
/// runs. Configuration problems are reported before the first frame is read.
pub struct ExtractWallpapersUseCase {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn ImageWriter>,
    scorer: BeautyScorer,
    executor: Box<dyn PipelineExecutor>,
    config: ExtractionConfig,
    on_progress: Option<ProgressFn>,
    cancelled: Arc<AtomicBool>,
}

impl ExtractWallpapersUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: Box<dyn VideoReader>,
        text_detector: Box<dyn TextDetector>,
        face_detector: Box<dyn FaceDetector>,
        writer: Box<dyn ImageWriter>,
        executor: Box<dyn PipelineExecutor>,
        config: ExtractionConfig,
        on_progress: Option<ProgressFn>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let scorer = BeautyScorer::new(
            ContentGate::new(text_detector),
            FaceSignal::new(face_detector),
            config.weights,
        );
        Ok(Self {
            reader,
            writer,
            scorer,
            executor,
            config,
            on_progress,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        })
    }

    pub fn execute(
        &mut self,
        input: &Path,
        logger: &mut dyn ScanLogger,
    ) -> Result<ExtractionReport, PipelineError> {
        let declared =
            self.reader
                .open(input)
                .map_err(|e| ConfigurationError::UnreadableSource {
                    path: input.to_path_buf(),
                    reason: e.to_string(),
                })?;
        let result = self.scan_open_source(declared, logger);
        self.reader.close();
        result
    }

    fn scan_open_source(
        &mut self,
        declared: VideoMetadata,
        logger: &mut dyn ScanLogger,
    ) -> Result<ExtractionReport, PipelineError> {
        let metadata = match self.config.fps_override {
            Some(fps) => declared.with_fps(fps),
            None => declared,
        };
        let stride = sampling_stride(metadata.fps)?;
        let output_dir = &self.config.output_dir;
        std::fs::create_dir_all(output_dir).map_err(|source| ConfigurationError::OutputDir {
            path: output_dir.clone(),
            source,
        })?;

        let length = metadata
            .duration_secs()
            .map(|secs| format!("{secs:.1}s"))
            .unwrap_or_else(|| "unknown-length".to_string());
        logger.info(&format!(
            "Scanning {length} {}x{} video at {} fps, one frame every {stride}",
            metadata.width, metadata.height, metadata.fps
        ));

        let scan = ScanConfig {
            stride,
            expected_samples: metadata.total_frames.div_ceil(stride),
            on_progress: self.on_progress.clone(),
            cancelled: self.cancelled.clone(),
        };
        let selector = self.config.strategy.selector(self.config.count);
        let outcome = self.executor.execute(
            self.reader.as_mut(),
            &mut self.scorer,
            selector,
            scan,
            logger,
        )?;

        let stats = outcome.stats;
        logger.info(&format!(
            "Sampled {} of {} frames: {} admitted, {} rejected by gate, {} skipped",
            stats.frames_sampled,
            stats.frames_read,
            stats.admitted,
            stats.rejected_by_gate(),
            stats.face_failures
        ));

        let saver = WallpaperSaver::new(
            self.writer.as_ref(),
            &self.config.output_dir,
            &self.config.extension,
        );
        let saved = saver.save(outcome.ranking, logger);
        logger.summary();

        Ok(ExtractionReport {
            metadata,
            stride,
            saved: saved.saved,
            failed: saved.failed,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::{FaceBox, FaceDetectionError};
    use crate::detection::domain::text_detector::TextDetectionError;
    use crate::pipeline::infrastructure::sequential_pipeline_executor::SequentialPipelineExecutor;
    use crate::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
    use crate::pipeline::pipeline_logger::NullScanLogger;
    use crate::shared::frame::Frame;
    use crate::video::infrastructure::image_file_writer::ImageFileWriter;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const W: u32 = 48;
    const H: u32 = 32;

    // --- Stubs ---

    #[derive(Default)]
    struct ReaderProbe {
        frames_pulled: AtomicUsize,
        closed: AtomicBool,
    }

    struct StubReader {
        source: Vec<Frame>,
        fps: f64,
        queue: Vec<Frame>,
        fail_at: Option<usize>,
        probe: Arc<ReaderProbe>,
    }

    impl StubReader {
        fn new(source: Vec<Frame>, fps: f64) -> Self {
            Self {
                source,
                fps,
                queue: Vec::new(),
                fail_at: None,
                probe: Arc::new(ReaderProbe::default()),
            }
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            if path.ends_with("missing.mp4") {
                return Err("no such file".into());
            }
            self.queue = self.source.clone();
            Ok(VideoMetadata {
                width: W,
                height: H,
                fps: self.fps,
                total_frames: self.source.len(),
                codec: "stub".into(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            let probe = self.probe.clone();
            let fail_at = self.fail_at;
            Box::new(self.queue.drain(..).map(move |f| {
                probe.frames_pulled.fetch_add(1, Ordering::SeqCst);
                if Some(f.index()) == fail_at {
                    Err("corrupt packet".into())
                } else {
                    Ok(f)
                }
            }))
        }

        fn close(&mut self) {
            self.probe.closed.store(true, Ordering::SeqCst);
        }
    }

    struct NoText;

    impl TextDetector for NoText {
        fn recognize(&mut self, _frame: &Frame) -> Result<String, TextDetectionError> {
            Ok(String::new())
        }
    }

    /// Two large faces on the listed frames, an error on `fail_on`.
    struct StubFaces {
        with_faces: Vec<usize>,
        fail_on: Option<usize>,
    }

    impl FaceDetector for StubFaces {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, FaceDetectionError> {
            if Some(frame.index()) == self.fail_on {
                return Err(FaceDetectionError::Inference("stub failure".into()));
            }
            if self.with_faces.contains(&frame.index()) {
                Ok(vec![
                    FaceBox::new(0, 0, 300, 300),
                    FaceBox::new(320, 0, 300, 300),
                ])
            } else {
                Ok(vec![])
            }
        }
    }

    /// Counts writes and fails those whose file name contains `fail_containing`.
    struct StubWriter {
        fail_containing: Option<&'static str>,
        written: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl ImageWriter for StubWriter {
        fn write(&self, path: &Path, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            if self.fail_containing.is_some_and(|s| name.contains(s)) {
                return Err("read-only file system".into());
            }
            self.written.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    // --- Frames ---

    fn frame_from_fn(index: usize, f: impl Fn(u32, u32) -> [u8; 3]) -> Frame {
        let mut data = Vec::with_capacity((W * H * 3) as usize);
        for y in 0..H {
            for x in 0..W {
                data.extend_from_slice(&f(x, y));
            }
        }
        Frame::new(data, W, H, 3, index)
    }

    fn flat(index: usize) -> Frame {
        frame_from_fn(index, |_, _| [90, 120, 150])
    }

    /// Sharp, colourful and mirror-symmetric.
    fn striking(index: usize) -> Frame {
        frame_from_fn(index, |x, y| {
            let m = x.min(W - 1 - x);
            if ((m / 2) + (y / 2)) % 2 == 0 {
                [255, 0, 0]
            } else {
                [0, 0, 255]
            }
        })
    }

    /// Horizontal stripes of varying colour: sharp but not symmetric-special.
    fn striped(index: usize, period: u32) -> Frame {
        frame_from_fn(index, move |_, y| {
            if (y / period) % 2 == 0 {
                [0, 200, 40]
            } else {
                [30, 30, 30]
            }
        })
    }

    /// Five seconds at 10 fps; only frame 20 is worth keeping.
    fn five_second_clip() -> Vec<Frame> {
        (0..50)
            .map(|i| if i == 20 { striking(i) } else { flat(i) })
            .collect()
    }

    fn config(dir: &Path, count: usize) -> ExtractionConfig {
        ExtractionConfig {
            count,
            output_dir: dir.to_path_buf(),
            ..ExtractionConfig::default()
        }
    }

    fn use_case(
        reader: StubReader,
        faces: StubFaces,
        writer: Box<dyn ImageWriter>,
        executor: Box<dyn PipelineExecutor>,
        config: ExtractionConfig,
        on_progress: Option<ProgressFn>,
    ) -> ExtractWallpapersUseCase {
        ExtractWallpapersUseCase::new(
            Box::new(reader),
            Box::new(NoText),
            Box::new(faces),
            writer,
            executor,
            config,
            on_progress,
            None,
        )
        .unwrap()
    }

    fn faces_on(frames: &[usize]) -> StubFaces {
        StubFaces {
            with_faces: frames.to_vec(),
            fail_on: None,
        }
    }

    fn recording_writer() -> (Box<dyn ImageWriter>, Arc<Mutex<Vec<PathBuf>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let writer = StubWriter {
            fail_containing: None,
            written: written.clone(),
        };
        (Box::new(writer), written)
    }

    fn sequential() -> Box<dyn PipelineExecutor> {
        Box::new(SequentialPipelineExecutor::new())
    }

    fn threaded() -> Box<dyn PipelineExecutor> {
        Box::new(ThreadedPipelineExecutor::with_capacity(2))
    }

    // --- End to end ---

    #[rstest]
    #[case::sequential(sequential())]
    #[case::threaded(threaded())]
    fn test_top_one_picks_the_striking_frame(#[case] executor: Box<dyn PipelineExecutor>) {
        let dir = tempfile::tempdir().unwrap();
        let mut uc = use_case(
            StubReader::new(five_second_clip(), 10.0),
            faces_on(&[20]),
            Box::new(ImageFileWriter::new()),
            executor,
            config(dir.path(), 1),
            None,
        );

        let report = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap();

        assert_eq!(report.stride, 10);
        assert_eq!(report.stats.frames_read, 50);
        assert_eq!(report.stats.frames_sampled, 5);
        assert_eq!(report.stats.admitted, 1);
        assert_eq!(report.stats.rejected_blurry, 4);
        assert_eq!(report.saved.len(), 1);

        let best = &report.saved[0];
        assert_eq!(best.rank, 0);
        assert_eq!(best.frame.index(), 20);
        let name = best.path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, format!("wallpaper_0_score_{:.2}.png", best.score));
        assert!(best.path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_saves_min_of_k_and_admitted() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, written) = recording_writer();
        let mut uc = use_case(
            StubReader::new(five_second_clip(), 10.0),
            faces_on(&[20]),
            writer,
            sequential(),
            config(dir.path(), 10),
            None,
        );
        let report = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap();
        assert_eq!(report.saved.len(), 1);
        assert_eq!(written.lock().unwrap().len(), 1);
    }

    #[rstest]
    #[case::buffered(SelectionStrategy::Buffered)]
    #[case::bounded(SelectionStrategy::Bounded)]
    fn test_ranks_are_descending_and_deterministic(#[case] strategy: SelectionStrategy) {
        let frames: Vec<Frame> = (0..60)
            .map(|i| match i {
                0 => striped(i, 1),
                10 => striking(i),
                20 => striped(i, 3),
                30 => striped(i, 2),
                _ => flat(i),
            })
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let run = || {
            let (writer, _) = recording_writer();
            let mut uc = use_case(
                StubReader::new(frames.clone(), 10.0),
                faces_on(&[10, 30]),
                writer,
                sequential(),
                ExtractionConfig {
                    strategy,
                    ..config(dir.path(), 3)
                },
                None,
            );
            uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap()
        };

        let first = run();
        let second = run();
        let summary = |r: &ExtractionReport| -> Vec<(usize, f64)> {
            r.saved.iter().map(|s| (s.frame.index(), s.score)).collect()
        };
        assert_eq!(summary(&first), summary(&second));
        assert_eq!(first.saved.len(), 3);
        assert!(first.saved.windows(2).all(|w| w[0].score >= w[1].score));
        let ranks: Vec<_> = first.saved.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
    }

    #[test]
    fn test_executors_agree() {
        let frames: Vec<Frame> = (0..40)
            .map(|i| match i {
                0 => striped(i, 2),
                10 => striking(i),
                30 => striped(i, 1),
                _ => flat(i),
            })
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let run = |executor: Box<dyn PipelineExecutor>| {
            let (writer, _) = recording_writer();
            let mut uc = use_case(
                StubReader::new(frames.clone(), 10.0),
                faces_on(&[10]),
                writer,
                executor,
                config(dir.path(), 5),
                None,
            );
            let report = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap();
            report
                .saved
                .iter()
                .map(|s| (s.frame.index(), s.score))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(sequential()), run(threaded()));
    }

    #[test]
    fn test_same_use_case_can_run_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut uc = use_case(
            StubReader::new(five_second_clip(), 10.0),
            faces_on(&[20]),
            Box::new(ImageFileWriter::new()),
            sequential(),
            config(dir.path(), 1),
            None,
        );
        let a = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap();
        let b = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap();
        assert_eq!(a.saved[0].score, b.saved[0].score);
        assert_eq!(
            std::fs::read(&a.saved[0].path).unwrap(),
            std::fs::read(&b.saved[0].path).unwrap()
        );
    }

    // --- Failures ---

    #[test]
    fn test_face_failure_skips_only_that_frame() {
        let frames: Vec<Frame> = (0..30)
            .map(|i| if i == 10 || i == 20 { striking(i) } else { flat(i) })
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let (writer, _) = recording_writer();
        let mut uc = use_case(
            StubReader::new(frames, 10.0),
            StubFaces {
                with_faces: vec![10, 20],
                fail_on: Some(10),
            },
            writer,
            sequential(),
            config(dir.path(), 5),
            None,
        );
        let report = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap();
        assert_eq!(report.stats.face_failures, 1);
        assert_eq!(report.saved.len(), 1);
        assert_eq!(report.saved[0].frame.index(), 20);
    }

    #[test]
    fn test_write_failure_reported_and_others_written() {
        let frames: Vec<Frame> = (0..30)
            .map(|i| match i {
                0 => striped(i, 1),
                10 => striking(i),
                20 => striped(i, 2),
                _ => flat(i),
            })
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let written = Arc::new(Mutex::new(Vec::new()));
        let writer = StubWriter {
            fail_containing: Some("wallpaper_1_"),
            written: written.clone(),
        };
        let mut uc = use_case(
            StubReader::new(frames, 10.0),
            faces_on(&[]),
            Box::new(writer),
            sequential(),
            config(dir.path(), 3),
            None,
        );
        let report = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].rank, 1);
        assert_eq!(report.saved.len(), 2);
        assert_eq!(written.lock().unwrap().len(), 2);
    }

    #[rstest]
    #[case::fractional(29.97)]
    #[case::zero(0.0)]
    #[case::nan(f64::NAN)]
    fn test_bad_frame_rate_fails_before_any_frame(#[case] fps: f64) {
        let dir = tempfile::tempdir().unwrap();
        let reader = StubReader::new(five_second_clip(), fps);
        let probe = reader.probe.clone();
        let (writer, written) = recording_writer();
        let mut uc = use_case(
            reader,
            faces_on(&[20]),
            writer,
            sequential(),
            config(dir.path(), 1),
            None,
        );
        let err = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Configuration(ConfigurationError::InvalidFrameRate(_))
        ));
        assert_eq!(probe.frames_pulled.load(Ordering::SeqCst), 0);
        assert!(probe.closed.load(Ordering::SeqCst));
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fps_override_replaces_declared_rate() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, _) = recording_writer();
        let mut uc = use_case(
            StubReader::new(five_second_clip(), 29.97),
            faces_on(&[20]),
            writer,
            sequential(),
            ExtractionConfig {
                fps_override: Some(10.0),
                ..config(dir.path(), 1)
            },
            None,
        );
        let report = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap();
        assert_eq!(report.stride, 10);
        assert_eq!(report.saved[0].frame.index(), 20);
    }

    #[test]
    fn test_unreadable_source_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, _) = recording_writer();
        let mut uc = use_case(
            StubReader::new(vec![], 10.0),
            faces_on(&[]),
            writer,
            sequential(),
            config(dir.path(), 1),
            None,
        );
        let err = uc
            .execute(Path::new("missing.mp4"), &mut NullScanLogger)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Configuration(ConfigurationError::UnreadableSource { .. })
        ));
    }

    #[rstest]
    #[case::zero_count(ExtractionConfig { count: 0, ..ExtractionConfig::default() })]
    #[case::bad_format(ExtractionConfig { extension: "gif".into(), ..ExtractionConfig::default() })]
    #[case::bad_weight(ExtractionConfig {
        weights: ScoreWeights { color: -1.0, ..ScoreWeights::default() },
        ..ExtractionConfig::default()
    })]
    #[case::bad_override(ExtractionConfig { fps_override: Some(12.5), ..ExtractionConfig::default() })]
    fn test_invalid_config_rejected_at_construction(#[case] config: ExtractionConfig) {
        let (writer, _) = recording_writer();
        let result = ExtractWallpapersUseCase::new(
            Box::new(StubReader::new(vec![], 10.0)),
            Box::new(NoText),
            Box::new(faces_on(&[])),
            writer,
            sequential(),
            config,
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_output_dir_created_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("walls");
        let mut uc = use_case(
            StubReader::new(five_second_clip(), 10.0),
            faces_on(&[20]),
            Box::new(ImageFileWriter::new()),
            sequential(),
            config(&out, 1),
            None,
        );
        let report = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap();
        assert!(out.is_dir());
        assert!(report.saved[0].path.starts_with(&out));
    }

    #[test]
    fn test_output_dir_failure_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let (writer, _) = recording_writer();
        let mut uc = use_case(
            StubReader::new(five_second_clip(), 10.0),
            faces_on(&[20]),
            writer,
            sequential(),
            config(&blocker.join("out"), 1),
            None,
        );
        let err = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Configuration(ConfigurationError::OutputDir { .. })
        ));
    }

    #[rstest]
    #[case::sequential(sequential())]
    #[case::threaded(threaded())]
    fn test_decode_error_aborts_run(#[case] executor: Box<dyn PipelineExecutor>) {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = StubReader::new(five_second_clip(), 10.0);
        reader.fail_at = Some(7);
        let (writer, written) = recording_writer();
        let mut uc = use_case(
            reader,
            faces_on(&[20]),
            writer,
            executor,
            config(dir.path(), 1),
            None,
        );
        let err = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap_err();
        assert!(matches!(err, PipelineError::Source { position: 7, .. }));
        assert!(written.lock().unwrap().is_empty());
    }

    // --- Cancellation ---

    #[rstest]
    #[case::sequential(sequential())]
    #[case::threaded(threaded())]
    fn test_cancel_via_progress_writes_nothing(#[case] executor: Box<dyn PipelineExecutor>) {
        let dir = tempfile::tempdir().unwrap();
        let (writer, written) = recording_writer();
        let progress: ProgressFn = Arc::new(|sampled, _| sampled < 2);
        let reader = StubReader::new(five_second_clip(), 10.0);
        let probe = reader.probe.clone();
        let mut uc = use_case(
            reader,
            faces_on(&[20]),
            writer,
            executor,
            config(dir.path(), 1),
            Some(progress),
        );
        let err = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
        assert!(written.lock().unwrap().is_empty());
        assert!(probe.closed.load(Ordering::SeqCst));
    }

    #[rstest]
    #[case::sequential(sequential())]
    #[case::threaded(threaded())]
    fn test_refused_progress_does_not_spend_the_use_case(
        #[case] executor: Box<dyn PipelineExecutor>,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let refuse = Arc::new(AtomicBool::new(true));
        let gate = refuse.clone();
        let progress: ProgressFn = Arc::new(move |_, _| !gate.load(Ordering::SeqCst));
        let (writer, written) = recording_writer();
        let mut uc = use_case(
            StubReader::new(five_second_clip(), 10.0),
            faces_on(&[20]),
            writer,
            executor,
            config(dir.path(), 1),
            Some(progress),
        );

        let err = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));

        refuse.store(false, Ordering::SeqCst);
        let report = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap();
        assert_eq!(report.saved.len(), 1);
        assert_eq!(report.saved[0].frame.index(), 20);
        assert_eq!(written.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_progress_reports_expected_samples() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |sampled, expected| {
            sink.lock().unwrap().push((sampled, expected));
            true
        });
        let (writer, _) = recording_writer();
        let mut uc = use_case(
            StubReader::new(five_second_clip(), 10.0),
            faces_on(&[20]),
            writer,
            sequential(),
            config(dir.path(), 1),
            Some(progress),
        );
        uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]
        );
    }

    #[test]
    fn test_pre_cancelled_run_reads_no_frames() {
        let dir = tempfile::tempdir().unwrap();
        let reader = StubReader::new(five_second_clip(), 10.0);
        let probe = reader.probe.clone();
        let (writer, _) = recording_writer();
        let mut uc = ExtractWallpapersUseCase::new(
            Box::new(reader),
            Box::new(NoText),
            Box::new(faces_on(&[20])),
            writer,
            sequential(),
            config(dir.path(), 1),
            None,
            Some(Arc::new(AtomicBool::new(true))),
        )
        .unwrap();
        let err = uc.execute(Path::new("clip.mp4"), &mut NullScanLogger).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
        assert_eq!(probe.frames_pulled.load(Ordering::SeqCst), 0);
    }
}
