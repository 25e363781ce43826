//! Episode identification from file names.
//!
//! Recognized shapes, case-insensitive, with `.`, `_`, space or `-` as
//! separators before the episode marker:
//! - `Show.Name.S01E05`
//! - `Show.Name.1x05`

use anyhow::Result;
use regex::Regex;
use std::fmt;
use std::path::Path;

const SEASON_EPISODE_PATTERN: &str = r"(?i)(.+?)[.\s_-]+S(\d{1,2})E(\d{1,2})";
const CROSS_PATTERN: &str = r"(?i)(.+?)[.\s_-]+(\d{1,2})x(\d{1,2})";

/// Show, season and episode parsed from a file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeInfo {
    pub show: String,
    pub season: u32,
    pub episode: u32,
}

impl fmt::Display for EpisodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} S{:02}E{:02}", self.show, self.season, self.episode)
    }
}

/// Compiled file name patterns, tried in order
#[derive(Debug, Clone)]
pub struct EpisodeParser {
    patterns: Vec<Regex>,
}

impl EpisodeParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            patterns: vec![Regex::new(SEASON_EPISODE_PATTERN)?, Regex::new(CROSS_PATTERN)?],
        })
    }

    /// Parse the stem of `path`; `None` when no pattern matches
    pub fn parse(&self, path: &Path) -> Option<EpisodeInfo> {
        let stem = path.file_stem()?.to_string_lossy();

        self.patterns.iter().find_map(|pattern| {
            let captures = pattern.captures(&stem)?;
            let show = captures[1].replace(['.', '_'], " ").trim().to_string();
            Some(EpisodeInfo {
                show,
                season: captures[2].parse().ok()?,
                episode: captures[3].parse().ok()?,
            })
        })
    }
}
