//! # Encoder Module
//!
//! Questo modulo esegue la codifica finale H.264 + AAC in Matroska.
//!
//! ## Responsabilità:
//! - Rifiuta input e output che risolvono allo stesso file
//! - Primo tentativo con l'encoder hardware (default `h264_videotoolbox`)
//! - Fallback esplicito all'encoder software (default `libx264 -preset veryfast`)
//! - Solo il fallimento del fallback è terminale
//!
//! ## Argomenti comuni:
//! `-b:v <kbps>k -c:a aac -b:a 192k`

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::args;
use crate::config::Config;
use crate::error::ConvertError;
use crate::process::ToolRunner;
use crate::utils::display_name;

/// Which encoder produced the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderUsed {
    Hardware(String),
    Software(String),
}

/// Runs the hardware-then-software encode sequence
pub struct Encoder {
    runner: Arc<dyn ToolRunner>,
    hardware_encoder: String,
    software_encoder: String,
    audio_bitrate: String,
}

impl Encoder {
    pub fn new(config: &Config, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            hardware_encoder: config.hardware_encoder.clone(),
            software_encoder: config.software_encoder.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
        }
    }

    /// ffmpeg arguments for one encode attempt
    pub fn ffmpeg_args(&self, input: &Path, output: &Path, video_codec: &str, preset: Option<&str>, kbps: u64) -> Vec<String> {
        let mut args = args!["-y", "-i", input.display(), "-c:v", video_codec];
        if let Some(preset) = preset {
            args.extend(args!["-preset", preset]);
        }
        args.extend(args![
            "-b:v", format!("{}k", kbps),
            "-c:a", "aac",
            "-b:a", self.audio_bitrate,
            output.display()
        ]);
        args
    }

    /// Encode `input` into `output` at `kbps`
    pub async fn encode(&self, input: &Path, output: &Path, kbps: u64) -> Result<EncoderUsed> {
        if resolve(input) == resolve(output) {
            return Err(ConvertError::InvalidConfiguration(format!(
                "input and output resolve to the same file: {}",
                input.display()
            ))
            .into());
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!("🎬 Encoding {} at {} kbps", display_name(input), kbps);

        let hardware = self.ffmpeg_args(input, output, &self.hardware_encoder, None, kbps);
        let result = self.runner.run("ffmpeg", &hardware).await;
        if result.succeeded() {
            debug!("Hardware encode succeeded for {}", display_name(input));
            return Ok(EncoderUsed::Hardware(self.hardware_encoder.clone()));
        }

        warn!(
            "{} failed for {} ({}), falling back to {}",
            self.hardware_encoder,
            display_name(input),
            result.failure_reason(),
            self.software_encoder
        );

        let software = self.ffmpeg_args(input, output, &self.software_encoder, Some("veryfast"), kbps);
        let result = self.runner.run("ffmpeg", &software).await;
        if result.succeeded() {
            return Ok(EncoderUsed::Software(self.software_encoder.clone()));
        }

        Err(ConvertError::Encode(format!(
            "both {} and {} failed for {}: {}",
            self.hardware_encoder,
            self.software_encoder,
            display_name(input),
            result.failure_reason()
        ))
        .into())
    }
}

/// Best-effort absolute form of `path`, valid for files that do not exist yet
fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| absolute.clone()),
        _ => absolute,
    }
}
