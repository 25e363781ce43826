//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON (`--json`) per uso programmatico.
//!
//! ## Responsabilità:
//! - Emette un messaggio JSON per riga su stdout
//! - Riusa `ConversionResult` e `ConversionSummary` come payload
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio della sessione di conversione
//! - `file_complete`: Verdetto di un file
//! - `complete`: Fine sessione con i contatori finali
//! - `error`: Errore generale (config, discovery)

use serde::Serialize;
use std::path::PathBuf;

use crate::config::Config;
use crate::progress::{ConversionResult, ConversionSummary};

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Inizio della sessione
    Start {
        input: PathBuf,
        output_dir: Option<PathBuf>,
        total_files: usize,
        config: JsonConfig,
    },

    /// Fine elaborazione di un file
    FileComplete {
        index: usize,
        total: usize,
        #[serde(flatten)]
        result: ConversionResult,
    },

    /// Sessione completata
    Complete {
        #[serde(flatten)]
        summary: ConversionSummary,
        duration_seconds: f64,
    },

    /// Errore generale
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione riportata nel messaggio `start`
#[derive(Debug, Serialize)]
pub struct JsonConfig {
    pub workers: usize,
    pub sd_baseline_bitrate: u64,
    pub keep_original: bool,
    pub no_metadata: bool,
    pub dry_run: bool,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(input: PathBuf, output_dir: Option<PathBuf>, total_files: usize, config: &Config) -> Self {
        Self::Start {
            input,
            output_dir,
            total_files,
            config: config.into(),
        }
    }

    pub fn file_complete(index: usize, total: usize, result: &ConversionResult) -> Self {
        Self::FileComplete {
            index,
            total,
            result: result.clone(),
        }
    }

    pub fn complete(summary: &ConversionSummary, duration_seconds: f64) -> Self {
        Self::Complete {
            summary: summary.clone(),
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            workers: config.workers,
            sd_baseline_bitrate: config.sd_baseline_bitrate,
            keep_original: config.keep_original,
            no_metadata: config.no_metadata,
            dry_run: config.dry_run,
        }
    }
}
