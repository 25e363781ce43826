//! # Progress Tracking Module
//!
//! Unifica progress bar e output JSON per l'aggregatore del batch.
//! Posseduto da un solo task: nessun lock.

use tracing::{debug, info, warn};

use crate::json_output::JsonMessage;
use crate::progress::{ConversionResult, ConversionSummary, ProgressManager};

/// How per-file completions are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// Progress bar on the terminal
    Bar,
    /// One JSON line per event
    Json,
    /// Logs only
    Quiet,
}

/// Per-batch progress reporter
pub struct ProgressTracker {
    pub total_files: usize,
    completed: usize,
    mode: ReportMode,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    pub fn new(total_files: usize, mode: ReportMode) -> Self {
        let progress_manager = match mode {
            ReportMode::Bar => ProgressManager::new(total_files as u64),
            ReportMode::Json | ReportMode::Quiet => ProgressManager::hidden(),
        };
        Self {
            total_files,
            completed: 0,
            mode,
            progress_manager,
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Report one finished file
    pub fn handle_file_completion(&mut self, result: &ConversionResult) {
        self.completed += 1;
        let line = self.completion_line(result);

        match self.mode {
            ReportMode::Json => {
                JsonMessage::file_complete(self.completed, self.total_files, result).emit();
                self.log_line(result, &line);
            }
            // Printed above the bar; the console layer would tear it
            ReportMode::Bar => {
                self.progress_manager.println(&line);
                debug!("{}", line);
            }
            ReportMode::Quiet => self.log_line(result, &line),
        }

        self.progress_manager.update(&result.status_line());
    }

    fn completion_line(&self, result: &ConversionResult) -> String {
        let position = format!("[{}/{}]", self.completed, self.total_files);
        match (&result.error, &result.warning) {
            (Some(error), _) => format!("{} Failed: {} ({})", position, result.path.display(), error),
            (None, Some(warning)) => format!("{} Converted with warning: {} ({})", position, result.path.display(), warning),
            (None, None) => format!("{} Converted: {}", position, result.path.display()),
        }
    }

    fn log_line(&self, result: &ConversionResult, line: &str) {
        if result.success && result.warning.is_none() {
            info!("{}", line);
        } else {
            warn!("{}", line);
        }
    }

    /// Finalize progress bar
    pub fn finish(&self, summary: &ConversionSummary) {
        self.progress_manager.finish(&format!(
            "Done: {} ok, {} failed, {} repaired",
            summary.successful, summary.failed, summary.repaired
        ));
    }
}
