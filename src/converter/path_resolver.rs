//! # Path Resolution Module
//!
//! Centralizza il calcolo del path di output di una conversione.

use std::path::{Path, PathBuf};

use crate::utils::stem_of;

/// Container extension of every converted file
pub const OUTPUT_EXTENSION: &str = "mkv";

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// `<output_dir or input dir>/<stem>.mkv`, or `<stem>_converted.mkv` when
    /// that would be the input itself
    pub fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
        let dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let stem = stem_of(input);

        let candidate = dir.join(format!("{}.{}", stem, OUTPUT_EXTENSION));
        if Self::same_location(&candidate, input) {
            dir.join(format!("{}_converted.{}", stem, OUTPUT_EXTENSION))
        } else {
            candidate
        }
    }

    fn same_location(a: &Path, b: &Path) -> bool {
        if a == b {
            return true;
        }
        match (a.canonicalize(), b.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}
