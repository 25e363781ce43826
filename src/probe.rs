//! # Stream Probing Module
//!
//! Questo modulo modella i metadati restituiti da ffprobe e li ottiene.
//!
//! ## Responsabilità:
//! - `StreamInfo` / `FormatInfo`: campi opzionali espliciti al posto di mappe dinamiche
//! - Deserializzazione tollerante: un campo con tipo inatteso diventa "assente"
//!   invece di far fallire l'intero probe
//! - `Prober`: trait del collaboratore di probe
//! - `FfprobeProber`: implementazione reale via `ffprobe -print_format json`
//!
//! ## Fallimenti:
//! Tool mancante, exit code non zero e JSON malformato collassano tutti in
//! `None` ("nessun dato disponibile"), loggati con il motivo.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

use crate::args;
use crate::process::ToolRunner;

/// One stream entry of the probe output
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamInfo {
    #[serde(default, deserialize_with = "lenient_text")]
    pub codec_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub codec_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub height: Option<u32>,
    /// Raw bitrate text; parsed by the bitrate resolver
    #[serde(default, deserialize_with = "lenient_text")]
    pub bit_rate: Option<String>,
    /// `"N/D"`, bare numeric text, or a JSON number rendered as text
    #[serde(default, deserialize_with = "lenient_text")]
    pub r_frame_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub color_space: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub pix_fmt: Option<String>,
}

impl StreamInfo {
    pub fn is_video(&self) -> bool {
        self.codec_type.as_deref() == Some("video")
    }

    pub fn codec_name(&self) -> &str {
        self.codec_name.as_deref().unwrap_or("")
    }
}

/// Container-level probe data
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FormatInfo {
    #[serde(default, deserialize_with = "lenient_text")]
    pub bit_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub format_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub duration: Option<String>,
}

/// Full probe result for one file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProbeData {
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
    #[serde(default)]
    pub format: Option<FormatInfo>,
}

impl ProbeData {
    /// First video stream, if any
    pub fn video_stream(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.is_video())
    }

    /// Parse ffprobe JSON output
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}

/// Probe collaborator
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `path`; every failure mode collapses to `None`
    async fn probe(&self, path: &Path) -> Option<ProbeData>;
}

/// Probes with `ffprobe`
pub struct FfprobeProber {
    runner: Arc<dyn ToolRunner>,
}

impl FfprobeProber {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe(&self, path: &Path) -> Option<ProbeData> {
        debug!("Probing file: {}", path.display());

        let output = self
            .runner
            .run(
                "ffprobe",
                &args!["-v", "error", "-print_format", "json", "-show_streams", "-show_format", path.display()],
            )
            .await;

        if !output.succeeded() {
            error!("Failed to probe {}: {}", path.display(), output.failure_reason());
            return None;
        }

        match ProbeData::from_json(&output.stdout) {
            Ok(data) => Some(data),
            Err(e) => {
                error!("Failed to parse ffprobe JSON for {}: {}", path.display(), e);
                None
            }
        }
    }
}
