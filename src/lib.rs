//! # Legacy Video Converter Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per i test di integrazione
//!
//! ## Architettura dei moduli:
//! - `classifier`: Nome codec → famiglia di codec
//! - `bitrate`: Bitrate base con la scala di fallback per risoluzione
//! - `smart_scale`: Fattore di scala, aggiustamenti per codec e contenuto
//! - `repair`: Strategia di riparazione per famiglia e dispatch uniforme
//! - `encode`: Encode H.264 hardware con fallback software
//! - `metadata`: Lookup e embedding dei metadati degli episodi
//! - `converter`: Orchestratore per file e per batch
//! - `probe` / `process` / `tool_resolver`: Collaboratori verso i tool esterni
//! - `config` / `error` / `file_manager` / `progress` / `json_output`: Infrastruttura
//!
//! ## Utilizzo:
//! ```ignore
//! use legacy_video_converter::{BatchConverter, Config, FileConverter, SystemToolRunner};
//!
//! let config = Config::default();
//! let converter = FileConverter::new(config.clone(), Arc::new(SystemToolRunner::default()))?;
//! let batch = BatchConverter::new(Arc::new(converter), config.effective_workers(files.len()));
//! let summary = batch.run(files, |_| {}).await;
//! ```

pub mod bitrate;
pub mod classifier;
pub mod config;
pub mod converter;
pub mod encode;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod metadata;
pub mod probe;
pub mod process;
pub mod progress;
pub mod repair;
pub mod smart_scale;
pub mod tool_resolver;
pub mod utils;

pub use classifier::{classify, CodecFamily};
pub use config::Config;
pub use converter::{BatchConverter, ConvertFile, FileConverter, ReportMode};
pub use error::ConvertError;
pub use probe::{Prober, ProbeData, StreamInfo};
pub use process::{SystemToolRunner, ToolOutput, ToolRunner};
pub use progress::{ConversionResult, ConversionSummary};
pub use repair::{needs_repair, RepairDispatcher, RepairStrategy};
pub use smart_scale::ScaleDecision;
