use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::selection::domain::frame_selector::Ranking;
use crate::shared::constants::WALLPAPER_FILE_PREFIX;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

use super::pipeline_executor::elapsed_ms;
use super::pipeline_logger::{ScanLogger, Stage};

/// `wallpaper_<rank>_score_<score>.<ext>` with the score at two decimals.
pub fn wallpaper_file_name(rank: usize, score: f64, extension: &str) -> String {
    format!("{WALLPAPER_FILE_PREFIX}{rank}_score_{score:.2}.{extension}")
}

#[derive(Clone, Debug, PartialEq)]
pub struct SavedWallpaper {
    pub rank: usize,
    pub score: f64,
    pub path: PathBuf,
    pub frame: Frame,
}

/// A ranked frame whose image could not be written.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteFailure {
    pub rank: usize,
    pub score: f64,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct SaveOutcome {
    pub saved: Vec<SavedWallpaper>,
    pub failed: Vec<WriteFailure>,
}

/// Writes a ranking to an output directory, one file per rank.
///
/// Each file is attempted independently; a failed write is recorded and the
/// remaining ranks are still written.
pub struct WallpaperSaver<'a> {
    writer: &'a dyn ImageWriter,
    output_dir: &'a Path,
    extension: &'a str,
}

impl<'a> WallpaperSaver<'a> {
    pub fn new(writer: &'a dyn ImageWriter, output_dir: &'a Path, extension: &'a str) -> Self {
        Self {
            writer,
            output_dir,
            extension,
        }
    }

    pub fn save(&self, ranking: Ranking, logger: &mut dyn ScanLogger) -> SaveOutcome {
        let mut outcome = SaveOutcome::default();
        for (rank, entry) in ranking.into_entries().into_iter().enumerate() {
            let path = self
                .output_dir
                .join(wallpaper_file_name(rank, entry.score, self.extension));

            let t = Instant::now();
            let result = self.writer.write(&path, &entry.frame);
            logger.timing(Stage::Write, elapsed_ms(t));

            match result {
                Ok(()) => {
                    logger.info(&format!(
                        "Saved {} (frame {})",
                        path.display(),
                        entry.frame.index()
                    ));
                    outcome.saved.push(SavedWallpaper {
                        rank,
                        score: entry.score,
                        path,
                        frame: entry.frame,
                    });
                }
                Err(e) => {
                    log::warn!("Failed to write {}: {e}", path.display());
                    outcome.failed.push(WriteFailure {
                        rank,
                        score: entry.score,
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }
        outcome
    }
}
