//! # Repair Dispatcher
//!
//! Questo modulo sceglie ed esegue il remux di riparazione per famiglia di codec.
//!
//! ## Responsabilità:
//! - `RepairStrategy`: una variante per trattamento, con argomenti e nome di output
//! - `needs_repair`: insieme chiuso delle famiglie da riparare
//! - `RepairDispatcher::dispatch`: crea la scratch dir, lancia ffmpeg, ritorna
//!   il path riparato (o l'originale per `Other`)
//!
//! ## Strategie:
//! - `Mpeg1 | Mpeg2 | Wmv` → remux con timestamp rigenerati (`+genpts`) in `.mkv`
//! - `Xvid` → unpack dei B-frame impacchettati (`mpeg4_unpack_bframes`) in `.avi`
//! - `H264` → remux semplice in `.mkv`
//!
//! I file riparati hanno nomi deterministici `<scratch>/<stem>_fixed.<ext>`.
//! Un exit code non zero del remux è un errore terminale per il file.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::args;
use crate::classifier::CodecFamily;
use crate::error::ConvertError;
use crate::process::ToolRunner;
use crate::utils::{display_name, stem_of};

/// Stream-copy treatment for a codec family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStrategy {
    /// Regenerate presentation timestamps, ignore decode errors
    GenptsRemux,
    /// Unpack packed B-frames of MPEG-4 Part 2 streams
    BframeUnpack,
    /// Plain stream-copy remux
    PlainRemux,
}

impl RepairStrategy {
    /// Strategy for `family`, `None` when the family needs no repair
    pub fn for_family(family: CodecFamily) -> Option<Self> {
        match family {
            CodecFamily::Mpeg1 | CodecFamily::Mpeg2 | CodecFamily::Wmv => Some(Self::GenptsRemux),
            CodecFamily::Xvid => Some(Self::BframeUnpack),
            CodecFamily::H264 => Some(Self::PlainRemux),
            CodecFamily::Other => None,
        }
    }

    /// Container extension of the repaired file
    pub fn output_extension(&self) -> &'static str {
        match self {
            Self::BframeUnpack => "avi",
            Self::GenptsRemux | Self::PlainRemux => "mkv",
        }
    }

    /// Deterministic scratch path for `input`
    pub fn output_path(&self, scratch_dir: &Path, input: &Path) -> PathBuf {
        scratch_dir.join(format!("{}_fixed.{}", stem_of(input), self.output_extension()))
    }

    /// ffmpeg arguments remuxing `input` into `output`
    pub fn ffmpeg_args(&self, input: &Path, output: &Path) -> Vec<String> {
        match self {
            Self::GenptsRemux => args![
                "-y", "-fflags", "+genpts", "-err_detect", "ignore_err",
                "-i", input.display(),
                "-c:v", "copy", "-c:a", "copy",
                output.display()
            ],
            Self::BframeUnpack => args![
                "-y", "-i", input.display(),
                "-c", "copy", "-bsf:v", "mpeg4_unpack_bframes",
                output.display()
            ],
            Self::PlainRemux => args![
                "-y", "-i", input.display(),
                "-c:v", "copy", "-c:a", "copy",
                output.display()
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenptsRemux => "genpts remux",
            Self::BframeUnpack => "bframe unpack",
            Self::PlainRemux => "plain remux",
        }
    }
}

/// Whether files of `family` go through a repair remux
pub fn needs_repair(family: CodecFamily) -> bool {
    RepairStrategy::for_family(family).is_some()
}

/// Result of a dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    /// File the encoder should read
    pub path: PathBuf,
    /// True when `path` is a repaired intermediate
    pub repaired: bool,
    pub strategy: Option<RepairStrategy>,
}

impl RepairOutcome {
    fn untouched(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            repaired: false,
            strategy: None,
        }
    }
}

/// Runs repair remuxes into a scratch directory
pub struct RepairDispatcher {
    scratch_dir: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl RepairDispatcher {
    pub fn new(scratch_dir: impl Into<PathBuf>, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            runner,
        }
    }

    /// Repair `input` according to its codec `family`.
    ///
    /// In dry-run mode the designated output path is returned and nothing runs.
    pub async fn dispatch(&self, input: &Path, family: CodecFamily, dry_run: bool) -> Result<RepairOutcome> {
        let Some(strategy) = RepairStrategy::for_family(family) else {
            debug!("No repair needed for {} ({})", display_name(input), family);
            return Ok(RepairOutcome::untouched(input));
        };

        let output = strategy.output_path(&self.scratch_dir, input);

        if dry_run {
            info!("[DRY RUN] Would repair {} with {} -> {}", display_name(input), strategy.as_str(), output.display());
            return Ok(RepairOutcome {
                path: output,
                repaired: true,
                strategy: Some(strategy),
            });
        }

        tokio::fs::create_dir_all(&self.scratch_dir).await.map_err(|e| {
            ConvertError::Repair(format!("cannot create scratch directory {}: {}", self.scratch_dir.display(), e))
        })?;

        info!("🔧 Repairing {} ({}, {})", display_name(input), family, strategy.as_str());
        let result = self.runner.run("ffmpeg", &strategy.ffmpeg_args(input, &output)).await;

        if !result.succeeded() {
            return Err(ConvertError::Repair(format!(
                "{} of {} failed: {}",
                strategy.as_str(),
                display_name(input),
                result.failure_reason()
            ))
            .into());
        }

        debug!("Repaired file written to {}", output.display());
        Ok(RepairOutcome {
            path: output,
            repaired: true,
            strategy: Some(strategy),
        })
    }
}
