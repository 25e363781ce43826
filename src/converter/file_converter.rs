//! # File Converter Module
//!
//! Worker per la conversione di un singolo file.
//!
//! ## Macchina a stati:
//! `Validate → Probe → Classify → Bitrate+Scale → Repair? → Encode →
//! Metadata? → Archive? → Done`
//!
//! - Validate, Probe, Repair, Encode: un fallimento è terminale per il file
//! - Metadata: un fallimento diventa un warning su un risultato riuscito
//! - Archive: un fallimento viene solo loggato
//!
//! In dry-run validate e probe girano normalmente; repair restituisce il
//! path designato, encode/metadata/archive vengono loggati e saltati.

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, Instrument};

use crate::bitrate::resolve_bitrate;
use crate::classifier::classify;
use crate::config::Config;
use crate::converter::path_resolver::PathResolver;
use crate::encode::Encoder;
use crate::error::ConvertError;
use crate::file_manager::FileManager;
use crate::metadata::{EpisodeCatalog, MetadataEmbedder, TvMazeCatalog};
use crate::probe::{FfprobeProber, Prober};
use crate::process::ToolRunner;
use crate::progress::ConversionResult;
use crate::repair::{needs_repair, RepairDispatcher};
use crate::smart_scale::ScaleDecision;
use crate::utils::display_name;

/// Converts one file into one verdict
#[async_trait]
pub trait ConvertFile: Send + Sync {
    async fn convert(&self, path: &Path) -> ConversionResult;
}

/// Worker that runs the full conversion pipeline on a file
pub struct FileConverter {
    config: Config,
    prober: Arc<dyn Prober>,
    repair: RepairDispatcher,
    encoder: Encoder,
    metadata: Option<MetadataEmbedder>,
}

impl FileConverter {
    /// Converter backed by real tools and the TVmaze catalog
    pub fn new(config: Config, runner: Arc<dyn ToolRunner>) -> Result<Self> {
        let prober: Arc<dyn Prober> = Arc::new(FfprobeProber::new(runner.clone()));
        let catalog: Option<Arc<dyn EpisodeCatalog>> = if config.no_metadata {
            None
        } else {
            Some(Arc::new(TvMazeCatalog::new(Duration::from_secs(config.metadata_timeout_secs))?))
        };
        Self::with_collaborators(config, prober, runner, catalog)
    }

    /// Converter with explicit collaborators; `catalog = None` disables metadata
    pub fn with_collaborators(
        config: Config,
        prober: Arc<dyn Prober>,
        runner: Arc<dyn ToolRunner>,
        catalog: Option<Arc<dyn EpisodeCatalog>>,
    ) -> Result<Self> {
        config.validate()?;

        let metadata = match catalog {
            Some(catalog) if !config.no_metadata => Some(MetadataEmbedder::new(catalog, runner.clone())?),
            _ => None,
        };

        Ok(Self {
            repair: RepairDispatcher::new(config.scratch_dir.clone(), runner.clone()),
            encoder: Encoder::new(&config, runner),
            prober,
            metadata,
            config,
        })
    }

    /// Output path the file will be encoded to
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        PathResolver::output_path(input, self.config.output_path.as_deref())
    }

    async fn run_pipeline(&self, path: &Path) -> ConversionResult {
        let dry_run = self.config.dry_run;

        if let Err(e) = FileManager::validate_file(path).await {
            error!("Validation failed: {:#}", e);
            return ConversionResult::from_error(path, &e, false);
        }

        let Some(probe) = self.prober.probe(path).await else {
            let e: anyhow::Error = ConvertError::Probe(format!("no probe data for {}", path.display())).into();
            error!("{:#}", e);
            return ConversionResult::from_error(path, &e, false);
        };
        let Some(stream) = probe.video_stream() else {
            let e: anyhow::Error = ConvertError::NoVideoStream(path.display().to_string()).into();
            error!("{:#}", e);
            return ConversionResult::from_error(path, &e, false);
        };

        let family = classify(stream.codec_name());
        let base_bitrate = resolve_bitrate(stream, probe.format.as_ref(), self.config.sd_baseline_bitrate);
        let decision = ScaleDecision::compute(stream, family, base_bitrate);
        info!(
            "Codec {} ({}), base {} bps × {:.3} → {} kbps",
            stream.codec_name(),
            family,
            base_bitrate,
            decision.final_scale,
            decision.target_kbps()
        );
        debug!("Scale decision: {:?}", decision);

        let mut repaired = false;
        let mut encode_input = path.to_path_buf();
        if needs_repair(family) {
            match self.repair.dispatch(path, family, dry_run).await {
                Ok(outcome) => {
                    repaired = outcome.repaired;
                    encode_input = outcome.path;
                }
                Err(e) => {
                    error!("{:#}", e);
                    return ConversionResult::from_error(path, &e, false);
                }
            }
        }

        let output = self.output_path_for(path);

        if dry_run {
            info!(
                "[DRY RUN] Would encode {} → {} at {} kbps",
                display_name(&encode_input),
                output.display(),
                decision.target_kbps()
            );
            if self.metadata.is_some() {
                info!("[DRY RUN] Would look up and embed episode metadata");
            }
            if !self.config.keep_original {
                info!("[DRY RUN] Would move original to {}", self.config.originals_dir.display());
            }
            return ConversionResult::succeeded(path, output, repaired, None);
        }

        if let Err(e) = self.encoder.encode(&encode_input, &output, decision.target_kbps()).await {
            error!("{:#}", e);
            return ConversionResult::from_error(path, &e, repaired);
        }
        if let Ok(size) = FileManager::file_size(&output).await {
            info!("✅ Encoded {} ({})", output.display(), FileManager::format_size(size));
        }

        let warning = match self.metadata {
            Some(ref metadata) => metadata.fetch_and_embed(path, &output).await,
            None => None,
        };

        if !self.config.keep_original {
            match FileManager::archive_original(path, &self.config.originals_dir).await {
                Ok(archived) => info!("Moved original to {}", archived.display()),
                Err(e) => error!("Failed to archive original {}: {:#}", path.display(), e),
            }
        }

        ConversionResult::succeeded(path, output, repaired, warning)
    }
}

#[async_trait]
impl ConvertFile for FileConverter {
    async fn convert(&self, path: &Path) -> ConversionResult {
        let span = info_span!("convert", file = %display_name(path));
        self.run_pipeline(path).instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{FormatInfo, ProbeData, StreamInfo};
    use crate::process::ToolOutput;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedProber(Option<ProbeData>);

    #[async_trait]
    impl Prober for FixedProber {
        async fn probe(&self, _path: &Path) -> Option<ProbeData> {
            self.0.clone()
        }
    }

    /// Succeeds unless the arguments contain `fail_on`
    #[derive(Default)]
    struct RecordingRunner {
        fail_on: Vec<&'static str>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl ToolRunner for RecordingRunner {
        async fn run(&self, tool: &str, args: &[String]) -> ToolOutput {
            self.calls.lock().unwrap().push((tool.to_string(), args.to_vec()));
            if self.fail_on.iter().any(|needle| args.iter().any(|a| a == needle)) {
                ToolOutput::failure(args.to_vec(), 1, "failed")
            } else {
                ToolOutput::success(args.to_vec(), "")
            }
        }
    }

    fn video(codec: &str, height: u32) -> ProbeData {
        ProbeData {
            streams: vec![StreamInfo {
                codec_name: Some(codec.to_string()),
                codec_type: Some("video".to_string()),
                height: Some(height),
                width: Some(height * 4 / 3),
                r_frame_rate: Some("25/1".to_string()),
                ..Default::default()
            }],
            format: Some(FormatInfo::default()),
        }
    }

    struct Fixture {
        temp: TempDir,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let config = Config {
                scratch_dir: temp.path().join("tmp_fix"),
                originals_dir: temp.path().join("originals"),
                no_metadata: true,
                ..Default::default()
            };
            Self { temp, config }
        }

        fn input(&self, name: &str) -> PathBuf {
            let path = self.temp.path().join(name);
            std::fs::write(&path, b"legacy").unwrap();
            path
        }

        fn converter(&self, probe: Option<ProbeData>, runner: Arc<RecordingRunner>) -> FileConverter {
            FileConverter::with_collaborators(self.config.clone(), Arc::new(FixedProber(probe)), runner, None).unwrap()
        }
    }

    #[tokio::test]
    async fn test_other_codec_skips_repair() {
        let fx = Fixture::new();
        let input = fx.input("modern.mov");
        let runner = Arc::new(RecordingRunner::default());

        let result = fx.converter(Some(video("hevc", 480)), runner.clone()).convert(&input).await;

        assert!(result.success);
        assert!(!result.repaired);
        assert_eq!(result.output, Some(fx.temp.path().join("modern.mkv")));
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1[2], input.display().to_string());
        assert!(fx.temp.path().join("originals/modern.mov").exists());
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_validation_failure() {
        let fx = Fixture::new();
        let input = fx.input("notes.txt");
        let runner = Arc::new(RecordingRunner::default());

        let result = fx.converter(Some(video("h264", 480)), runner.clone()).convert(&input).await;

        assert!(!result.success);
        assert_eq!(result.stage, Some("validate"));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_probe_failures_are_terminal() {
        let fx = Fixture::new();
        let input = fx.input("odd.avi");
        let runner = Arc::new(RecordingRunner::default());

        let no_data = fx.converter(None, runner.clone()).convert(&input).await;
        assert_eq!(no_data.stage, Some("probe"));

        let audio_only = ProbeData {
            streams: vec![StreamInfo {
                codec_type: Some("audio".into()),
                ..Default::default()
            }],
            format: None,
        };
        let no_video = fx.converter(Some(audio_only), runner.clone()).convert(&input).await;
        assert!(!no_video.success);
        assert_eq!(no_video.stage, Some("probe"));
        assert!(runner.calls.lock().unwrap().is_empty());
        assert!(input.exists());
    }

    #[tokio::test]
    async fn test_repair_failure_stops_before_encode() {
        let fx = Fixture::new();
        let input = fx.input("clip.avi");
        let runner = Arc::new(RecordingRunner {
            fail_on: vec!["mpeg4_unpack_bframes"],
            ..Default::default()
        });

        let result = fx.converter(Some(video("mpeg4", 480)), runner.clone()).convert(&input).await;

        assert!(!result.success);
        assert_eq!(result.stage, Some("repair"));
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
        assert!(input.exists());
    }

    #[tokio::test]
    async fn test_encode_failure_keeps_original() {
        let fx = Fixture::new();
        let input = fx.input("clip.wmv");
        let runner = Arc::new(RecordingRunner {
            fail_on: vec!["h264_videotoolbox", "libx264"],
            ..Default::default()
        });

        let result = fx.converter(Some(video("wmv3", 480)), runner).convert(&input).await;

        assert!(!result.success);
        assert!(result.repaired);
        assert_eq!(result.stage, Some("encode"));
        assert!(input.exists());
    }

    #[tokio::test]
    async fn test_keep_original() {
        let mut fx = Fixture::new();
        fx.config.keep_original = true;
        let input = fx.input("keep.mp4");

        let result = fx.converter(Some(video("hevc", 720)), Arc::new(RecordingRunner::default())).convert(&input).await;

        assert!(result.success);
        assert!(input.exists());
        assert!(!fx.temp.path().join("originals").exists());
    }

    #[tokio::test]
    async fn test_dry_run_only_probes() {
        let mut fx = Fixture::new();
        fx.config.dry_run = true;
        let input = fx.input("old.mpg");
        let runner = Arc::new(RecordingRunner::default());

        let result = fx.converter(Some(video("mpeg2video", 576)), runner.clone()).convert(&input).await;

        assert!(result.success);
        assert!(result.repaired);
        assert!(runner.calls.lock().unwrap().is_empty());
        assert!(input.exists());
        assert!(!fx.config.scratch_dir.exists());
    }

    #[tokio::test]
    async fn test_bitrate_reaches_encoder() {
        let fx = Fixture::new();
        let input = fx.input("show.avi");
        let runner = Arc::new(RecordingRunner::default());
        // 720p, 25 fps, no bitrate → 3_000_000 × 1.5 = 4500 kbps
        let mut probe = video("h264", 720);
        probe.streams[0].width = None;

        let result = fx.converter(Some(probe), runner.clone()).convert(&input).await;

        assert!(result.success);
        let calls = runner.calls.lock().unwrap();
        let encode = &calls.last().unwrap().1;
        assert!(encode.contains(&"4500k".to_string()));
        assert!(encode.contains(&fx.config.scratch_dir.join("show_fixed.mkv").display().to_string()));
    }
}
