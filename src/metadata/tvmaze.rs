//! TVmaze episode catalog.
//!
//! Two requests per lookup: a show search (first hit wins), then the episode
//! by season and number. A 404 on the episode is "no match", not an error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{EpisodeCatalog, EpisodeMetadata};
use crate::error::ConvertError;

pub const TVMAZE_BASE_URL: &str = "https://api.tvmaze.com";

#[derive(Debug, Deserialize)]
struct SearchHit {
    show: ShowRef,
}

#[derive(Debug, Deserialize)]
struct ShowRef {
    id: u64,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EpisodeResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    airdate: Option<String>,
}

/// TVmaze REST client
pub struct TvMazeCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl TvMazeCatalog {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(TVMAZE_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ConvertError::Http)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn search_show(&self, show: &str) -> Result<Option<ShowRef>> {
        let url = format!("{}/search/shows", self.base_url);
        debug!("Searching TVmaze for show: {}", show);

        let hits: Vec<SearchHit> = self
            .client
            .get(&url)
            .query(&[("q", show)])
            .send()
            .await
            .with_context(|| format!("TVmaze search request failed for {:?}", show))?
            .error_for_status()
            .context("TVmaze search returned an error status")?
            .json()
            .await
            .context("failed to parse TVmaze search response")?;

        Ok(hits.into_iter().next().map(|hit| hit.show))
    }
}

#[async_trait]
impl EpisodeCatalog for TvMazeCatalog {
    async fn episode(&self, show: &str, season: u32, episode: u32) -> Result<Option<EpisodeMetadata>> {
        let Some(found) = self.search_show(show).await? else {
            debug!("No TVmaze results for show: {}", show);
            return Ok(None);
        };
        debug!("Found show: {} (ID: {})", found.name.as_deref().unwrap_or(show), found.id);

        let url = format!("{}/shows/{}/episodebynumber", self.base_url, found.id);
        let response = self
            .client
            .get(&url)
            .query(&[("season", season), ("number", episode)])
            .send()
            .await
            .context("TVmaze episode request failed")?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Episode S{:02}E{:02} not found for show {}", season, episode, found.id);
            return Ok(None);
        }

        let body: EpisodeResponse = response
            .error_for_status()
            .context("TVmaze episode request returned an error status")?
            .json()
            .await
            .context("failed to parse TVmaze episode response")?;

        Ok(Some(EpisodeMetadata {
            title: body.name.unwrap_or_default(),
            summary: body.summary.as_deref().map(clean_summary).unwrap_or_default(),
            airdate: body.airdate.unwrap_or_default(),
        }))
    }
}

/// Decode HTML entities, then strip tags
pub fn clean_summary(html: &str) -> String {
    strip_tags(&html_escape::decode_html_entities(html))
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        match rest[start..].find('>') {
            Some(end) => rest = &rest[start + end + 1..],
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
