//! # Progress Tracking and Summary Module
//!
//! Questo modulo gestisce il progress tracking e il riepilogo della conversione.
//!
//! ## Responsabilità:
//! - Progress bar visuale con `indicatif` per feedback real-time
//! - `ConversionResult`: verdetto unico per file (successo, warning, errore, stadio)
//! - `ConversionSummary`: contatori aggregati, posseduti da un solo aggregatore
//! - Report finale testuale (contatori, spazio libero, directory)
//!
//! ## Contatori:
//! - **successful**: conversioni riuscite (anche con warning)
//! - **failed**: conversioni fallite in validate/probe/repair/encode
//! - **warned**: conversioni riuscite con un warning (metadata)
//! - **repaired**: file passati per un remux di riparazione
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [========================================] 12/12 (100%) ✅ Show.S01E01.avi
//! ```

use anyhow::Error;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConvertError;
use crate::utils::display_name;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Manages the batch progress bar
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .map(|s| s.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Advance by one file with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Print a line above the bar without corrupting it
    pub fn println(&self, message: &str) {
        if self.bar.is_hidden() {
            return;
        }
        self.bar.println(message);
    }
}

/// Verdict for one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub path: PathBuf,
    pub success: bool,
    pub repaired: bool,
    pub warning: Option<String>,
    pub error: Option<String>,
    /// Stage a failure happened in
    pub stage: Option<&'static str>,
    pub output: Option<PathBuf>,
}

impl ConversionResult {
    pub fn succeeded(path: &Path, output: PathBuf, repaired: bool, warning: Option<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            success: true,
            repaired,
            warning,
            error: None,
            stage: None,
            output: Some(output),
        }
    }

    pub fn failed(path: &Path, stage: &'static str, error: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            repaired: false,
            warning: None,
            error: Some(error.into()),
            stage: Some(stage),
            output: None,
        }
    }

    /// Failed result with the stage taken from a `ConvertError`, if any
    pub fn from_error(path: &Path, error: &Error, repaired: bool) -> Self {
        let stage = error
            .downcast_ref::<ConvertError>()
            .map(ConvertError::stage)
            .unwrap_or("internal");
        Self {
            repaired,
            ..Self::failed(path, stage, format!("{:#}", error))
        }
    }

    /// One-line status for the progress bar
    pub fn status_line(&self) -> String {
        let name = display_name(&self.path);
        match (self.success, &self.warning) {
            (true, None) => format!("✅ {}", name),
            (true, Some(_)) => format!("⚠️  {}", name),
            (false, _) => format!("❌ {}", name),
        }
    }
}

/// Aggregate counts over a batch
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub successful: usize,
    pub failed: usize,
    pub warned: usize,
    pub repaired: usize,
}

impl ConversionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &ConversionResult) {
        if result.success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        if result.warning.is_some() {
            self.warned += 1;
        }
        if result.repaired {
            self.repaired += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.successful + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Human-readable report; `free_space` is in bytes
    pub fn format_summary(
        &self,
        free_space: Option<u64>,
        log_dir: Option<&Path>,
        originals_dir: &Path,
        scratch_dir: &Path,
    ) -> String {
        let rule = "=".repeat(60);
        let free_line = match free_space {
            Some(bytes) => format!("Free disk space: {:.2} GB", bytes as f64 / GIB),
            None => "Free disk space: (unavailable)".to_string(),
        };
        let log_line = match log_dir {
            Some(dir) => format!("Logs saved in: {}", dir.display()),
            None => "Logs saved in: (disabled)".to_string(),
        };

        [
            String::new(),
            rule.clone(),
            "Conversion Summary".to_string(),
            rule.clone(),
            String::new(),
            format!("Successful conversions: {}", self.successful),
            format!("Warnings: {}", self.warned),
            format!("Errors: {}", self.failed),
            format!("Repairs completed: {}", self.repaired),
            String::new(),
            free_line,
            String::new(),
            log_line,
            format!("Originals moved to: {}", originals_dir.display()),
            format!("Temp fixed files in: {}", scratch_dir.display()),
            String::new(),
            "All conversions complete.".to_string(),
            rule,
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = ConversionSummary::new();
        summary.record(&ConversionResult::succeeded(Path::new("a.avi"), "a.mkv".into(), true, None));
        summary.record(&ConversionResult::succeeded(Path::new("b.avi"), "b.mkv".into(), false, Some("no tags".into())));
        summary.record(&ConversionResult::failed(Path::new("c.avi"), "probe", "no data"));

        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.warned, 1);
        assert_eq!(summary.repaired, 1);
        assert_eq!(summary.total(), 3);
        assert!(!summary.all_succeeded());
    }

    #[test]
    fn test_stage_from_typed_error() {
        let err: Error = ConvertError::Repair("exit code 1".into()).into();
        let result = ConversionResult::from_error(Path::new("x.mpg"), &err, false);
        assert_eq!(result.stage, Some("repair"));
        assert!(!result.success);
        assert!(result.error.unwrap().contains("exit code 1"));

        let untyped = anyhow::anyhow!("task panicked");
        assert_eq!(ConversionResult::from_error(Path::new("y.mpg"), &untyped, false).stage, Some("internal"));
    }

    #[test]
    fn test_format_summary() {
        let summary = ConversionSummary {
            successful: 3,
            failed: 1,
            warned: 2,
            repaired: 3,
        };
        let text = summary.format_summary(
            Some(3 * 1024 * 1024 * 1024 / 2),
            Some(Path::new("logs")),
            Path::new("originals"),
            Path::new("tmp_fix"),
        );
        assert!(text.contains("Successful conversions: 3"));
        assert!(text.contains("Warnings: 2"));
        assert!(text.contains("Errors: 1"));
        assert!(text.contains("Repairs completed: 3"));
        assert!(text.contains("Logs saved in: logs"));
        assert!(text.contains("Temp fixed files in: tmp_fix"));
        assert!(text.contains("Free disk space: 1.50 GB"));

        let unknown = summary.format_summary(None, None, Path::new("originals"), Path::new("tmp_fix"));
        assert!(unknown.contains("Free disk space: (unavailable)"));
        assert!(unknown.contains("Logs saved in: (disabled)"));
    }

    #[test]
    fn test_status_line() {
        let ok = ConversionResult::succeeded(Path::new("/v/a.avi"), "a.mkv".into(), false, None);
        assert_eq!(ok.status_line(), "✅ a.avi");
        let bad = ConversionResult::failed(Path::new("/v/b.avi"), "encode", "boom");
        assert_eq!(bad.status_line(), "❌ b.avi");
    }

    #[test]
    fn test_hidden_progress_counts() {
        let progress = ProgressManager::hidden();
        progress.update("a");
        progress.update("b");
        assert_eq!(progress.position(), 2);
    }
}
