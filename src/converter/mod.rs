//! # Converter Module
//!
//! Modulo di orchestrazione separato in sottomoduli:
//! - `batch`: Pool di worker e aggregatore unico del batch
//! - `file_converter`: Worker per singoli file (macchina a stati)
//! - `progress_tracker`: Progress bar e output JSON per file
//! - `path_resolver`: Calcolo del path di output

pub mod batch;
pub mod file_converter;
pub mod path_resolver;
pub mod progress_tracker;

pub use batch::BatchConverter;
pub use file_converter::{ConvertFile, FileConverter};
pub use path_resolver::PathResolver;
pub use progress_tracker::{ProgressTracker, ReportMode};
