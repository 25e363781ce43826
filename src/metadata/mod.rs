//! # Episode Metadata Module
//!
//! Questo modulo arricchisce i file convertiti con i tag dell'episodio.
//!
//! ## Pipeline:
//! 1. `EpisodeParser`: show/stagione/episodio dal nome del file
//! 2. `EpisodeCatalog`: lookup del titolo, sinossi e data di messa in onda
//!    (implementazione reale: `TvMazeCatalog`)
//! 3. `embed`: scrittura dei tag Matroska via `mkvpropedit`
//!
//! ## Politica di errore:
//! Best-effort. Nessun match sul nome o nel catalogo non è un errore;
//! errori di rete, timeout, HTTP, parsing o un `mkvpropedit` fallito
//! diventano un warning sul risultato, mai un fallimento della conversione.

pub mod embed;
pub mod episode;
pub mod tvmaze;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::process::ToolRunner;
use crate::utils::display_name;

pub use episode::{EpisodeInfo, EpisodeParser};
pub use tvmaze::TvMazeCatalog;

/// Catalog data for one episode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeMetadata {
    pub title: String,
    /// Plain text, HTML already removed
    pub summary: String,
    /// `YYYY-MM-DD` when the catalog knows it
    pub airdate: String,
}

/// Episode lookup collaborator
#[async_trait]
pub trait EpisodeCatalog: Send + Sync {
    /// `Ok(None)` when the show or the episode is unknown
    async fn episode(&self, show: &str, season: u32, episode: u32) -> Result<Option<EpisodeMetadata>>;
}

/// Looks up and embeds episode tags
pub struct MetadataEmbedder {
    parser: EpisodeParser,
    catalog: Arc<dyn EpisodeCatalog>,
    runner: Arc<dyn ToolRunner>,
}

impl MetadataEmbedder {
    pub fn new(catalog: Arc<dyn EpisodeCatalog>, runner: Arc<dyn ToolRunner>) -> Result<Self> {
        Ok(Self {
            parser: EpisodeParser::new()?,
            catalog,
            runner,
        })
    }

    /// Tag `mkv` using the episode encoded in `source`'s file name.
    ///
    /// Returns a warning message when something went wrong, `None` otherwise.
    pub async fn fetch_and_embed(&self, source: &Path, mkv: &Path) -> Option<String> {
        let Some(info) = self.parser.parse(source) else {
            debug!("No episode pattern in file name: {}", display_name(source));
            return None;
        };
        info!("📺 Parsed episode info: {}", info);

        let metadata = match self.catalog.episode(&info.show, info.season, info.episode).await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                info!("Metadata not available for {}, skipping embedding", info);
                return None;
            }
            Err(e) => {
                warn!("Metadata lookup failed for {}: {:#}", info, e);
                return Some(format!("metadata lookup failed: {:#}", e));
            }
        };

        let Some(args) = embed::mkvpropedit_args(mkv, &metadata) else {
            debug!("Catalog entry for {} has nothing to embed", info);
            return None;
        };

        let output = self.runner.run("mkvpropedit", &args).await;
        if !output.succeeded() {
            warn!("mkvpropedit failed for {}: {}", display_name(mkv), output.failure_reason());
            return Some(format!("metadata embedding failed: {}", output.failure_reason()));
        }

        info!("✓ Metadata embedded into {} ({})", display_name(mkv), metadata.title);
        None
    }
}
