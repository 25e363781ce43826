//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione del convertitore.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di conversione
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri principali:
//! - `sd_baseline_bitrate`: Bitrate SD di fallback (default: 1_200_000 bps)
//! - `workers`: Numero di worker paralleli (default: 4, env `CONVERTER_MAX_WORKERS`)
//! - `scratch_dir`: Directory per i file riparati temporanei (default: `tmp_fix`)
//! - `originals_dir`: Directory di archivio degli originali (default: `originals`)
//! - `log_dir`: Directory dei log di sessione (default: `logs`)
//! - `hardware_encoder` / `software_encoder`: Codec primario e di fallback
//! - `dry_run`: Simula senza modificare file (default: false)
//!
//! ## Esempio:
//! ```rust
//! use legacy_video_converter::Config;
//!
//! let config = Config {
//!     workers: 8,
//!     keep_original: true,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the default worker count
pub const WORKERS_ENV: &str = "CONVERTER_MAX_WORKERS";

/// Default SD baseline bitrate in bits per second (1200 kbps)
pub const DEFAULT_SD_BITRATE: u64 = 1_200_000;

/// Configuration for a conversion session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SD baseline used by the bitrate fallback ladder (bps)
    pub sd_baseline_bitrate: u64,
    /// Number of parallel workers
    pub workers: usize,
    /// Process files through the worker pool (false = one at a time)
    pub parallel: bool,
    /// Output directory for converted files (None = next to the input)
    pub output_path: Option<PathBuf>,
    /// Scan subdirectories when the input is a directory
    pub recursive: bool,
    /// Leave the source file in place after a successful encode
    pub keep_original: bool,
    /// Dry run - probe and decide, but don't write anything
    pub dry_run: bool,
    /// Skip episode metadata lookup and embedding
    pub no_metadata: bool,
    /// Show the batch progress bar
    pub show_progress: bool,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
    /// Scratch directory for repaired intermediates
    pub scratch_dir: PathBuf,
    /// Directory originals are moved into
    pub originals_dir: PathBuf,
    /// Directory for session log files
    pub log_dir: PathBuf,
    /// Hardware-accelerated encoder tried first
    pub hardware_encoder: String,
    /// Software encoder used when the hardware one fails
    pub software_encoder: String,
    /// Audio bitrate passed to the encoder
    pub audio_bitrate: String,
    /// Timeout for each catalog request
    pub metadata_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sd_baseline_bitrate: DEFAULT_SD_BITRATE,
            workers: default_workers(),
            parallel: true,
            output_path: None,
            recursive: false,
            keep_original: false,
            dry_run: false,
            no_metadata: false,
            show_progress: true,
            json_output: false,
            scratch_dir: PathBuf::from("tmp_fix"),
            originals_dir: PathBuf::from("originals"),
            log_dir: PathBuf::from("logs"),
            hardware_encoder: "h264_videotoolbox".to_string(),
            software_encoder: "libx264".to_string(),
            audio_bitrate: "192k".to_string(),
            metadata_timeout_secs: 10,
        }
    }
}

/// Worker count from `CONVERTER_MAX_WORKERS`, 4 when unset or invalid
fn default_workers() -> usize {
    std::env::var(WORKERS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(4)
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.sd_baseline_bitrate == 0 {
            return Err(anyhow::anyhow!("SD baseline bitrate must be greater than 0"));
        }

        if self.hardware_encoder.trim().is_empty() || self.software_encoder.trim().is_empty() {
            return Err(anyhow::anyhow!("Encoder names must not be empty"));
        }

        // Validate output path if specified (it is created later when missing)
        if let Some(ref output_path) = self.output_path {
            if output_path.exists() && !output_path.is_dir() {
                return Err(anyhow::anyhow!("Output path is not a directory: {}", output_path.display()));
            }
        }

        Ok(())
    }

    /// Effective worker count for a batch of `file_count` files
    pub fn effective_workers(&self, file_count: usize) -> usize {
        if !self.parallel || file_count <= 1 {
            1
        } else {
            self.workers.min(file_count).max(1)
        }
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
