//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom del convertitore.
//!
//! ## Responsabilità:
//! - Definisce `ConvertError` enum per categorizzare ogni fallimento per stadio
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Validation`: path inesistente, non leggibile, estensione non supportata
//! - `Probe` / `NoVideoStream`: ffprobe fallito o nessuno stream video
//! - `Repair`: remux di riparazione fallito (terminale, niente encode)
//! - `Encode`: entrambi i tentativi di encode falliti
//! - `InvalidConfiguration`: input e output coincidono, config non valida
//! - `Metadata` / `Archive`: non terminali, degradati a warning dal chiamante
//! - `MissingDependency`: tool esterno mancante (ffmpeg, ffprobe, mkvpropedit)
//!
//! ## Esempio:
//! ```ignore
//! if input == output {
//!     return Err(ConvertError::InvalidConfiguration("input and output paths must differ".into()).into());
//! }
//! ```

/// Custom error types for video conversion
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("File validation error: {0}")]
    Validation(String),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("No video stream found in: {0}")]
    NoVideoStream(String),

    #[error("Repair failed: {0}")]
    Repair(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Metadata embedding error: {0}")]
    Metadata(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),
}

impl ConvertError {
    /// Stage label used in per-file results and logs
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validate",
            Self::Probe(_) | Self::NoVideoStream(_) | Self::Json(_) => "probe",
            Self::Repair(_) => "repair",
            Self::Encode(_) | Self::InvalidConfiguration(_) => "encode",
            Self::Metadata(_) | Self::Http(_) => "metadata",
            Self::Archive(_) => "archive",
            Self::Io(_) | Self::MissingDependency(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        assert_eq!(ConvertError::Validation("x".into()).stage(), "validate");
        assert_eq!(ConvertError::NoVideoStream("x".into()).stage(), "probe");
        assert_eq!(ConvertError::Repair("x".into()).stage(), "repair");
        assert_eq!(ConvertError::InvalidConfiguration("x".into()).stage(), "encode");
    }

    #[test]
    fn test_display_includes_detail() {
        let err = ConvertError::Repair("ffmpeg exited with status 1".into());
        assert_eq!(err.to_string(), "Repair failed: ffmpeg exited with status 1");
    }
}
