//! End-to-end conversion scenarios with faked external tools.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use legacy_video_converter::encode::Encoder;
use legacy_video_converter::probe::FormatInfo;
use legacy_video_converter::{
    BatchConverter, Config, ConversionResult, ConvertError, ConvertFile, FileConverter, ProbeData, Prober,
    StreamInfo, ToolOutput, ToolRunner,
};

/// Records every invocation and succeeds
#[derive(Default)]
struct RecordingRunner {
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingRunner {
    fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolRunner for RecordingRunner {
    async fn run(&self, tool: &str, args: &[String]) -> ToolOutput {
        self.calls.lock().unwrap().push((tool.to_string(), args.to_vec()));
        ToolOutput::success(args.to_vec(), "")
    }
}

struct FixedProber(ProbeData);

#[async_trait]
impl Prober for FixedProber {
    async fn probe(&self, _path: &Path) -> Option<ProbeData> {
        Some(self.0.clone())
    }
}

fn mpeg1_probe() -> ProbeData {
    ProbeData {
        streams: vec![StreamInfo {
            codec_name: Some("mpeg1video".into()),
            codec_type: Some("video".into()),
            height: Some(480),
            r_frame_rate: Some("30/1".into()),
            ..Default::default()
        }],
        format: Some(FormatInfo::default()),
    }
}

fn test_config(temp: &TempDir) -> Config {
    Config {
        scratch_dir: temp.path().join("tmp_fix"),
        originals_dir: temp.path().join("originals"),
        output_path: Some(temp.path().join("out")),
        no_metadata: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn mpeg1_file_is_remuxed_then_encoded_at_1440_kbps() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("old_home_video.mpg");
    std::fs::write(&input, b"mpeg1").unwrap();
    let config = test_config(&temp);
    let runner = Arc::new(RecordingRunner::default());

    let converter =
        FileConverter::with_collaborators(config.clone(), Arc::new(FixedProber(mpeg1_probe())), runner.clone(), None)
            .unwrap();
    let result = converter.convert(&input).await;

    assert!(result.success, "{:?}", result.error);
    assert!(result.repaired);
    assert_eq!(result.output, Some(temp.path().join("out/old_home_video.mkv")));

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);

    let fixed = config.scratch_dir.join("old_home_video_fixed.mkv").display().to_string();
    let (tool, remux) = &calls[0];
    assert_eq!(tool, "ffmpeg");
    assert!(remux.windows(2).any(|w| w == ["-fflags", "+genpts"]));
    assert_eq!(remux.last(), Some(&fixed));

    let (_, encode) = &calls[1];
    assert!(encode.windows(2).any(|w| w[0] == "-i" && w[1] == fixed));
    assert!(encode.windows(2).any(|w| w == ["-b:v", "1440k"]));
    assert!(encode.windows(2).any(|w| w == ["-c:v", "h264_videotoolbox"]));

    assert!(!input.exists());
    assert!(temp.path().join("originals/old_home_video.mpg").exists());
}

#[tokio::test]
async fn encoder_rejects_identical_input_and_output() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("episode.mkv");
    std::fs::write(&file, b"mkv").unwrap();
    let runner = Arc::new(RecordingRunner::default());
    let encoder = Encoder::new(&Config::default(), runner.clone());

    let err = encoder.encode(&file, &file, 1440).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ConvertError>(),
        Some(ConvertError::InvalidConfiguration(_))
    ));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn mkv_input_without_output_dir_gets_converted_suffix() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("episode.mkv");
    std::fs::write(&input, b"mkv").unwrap();
    let config = Config {
        output_path: None,
        keep_original: true,
        ..test_config(&temp)
    };
    let runner = Arc::new(RecordingRunner::default());
    let mut probe = mpeg1_probe();
    probe.streams[0].codec_name = Some("hevc".into());

    let converter =
        FileConverter::with_collaborators(config, Arc::new(FixedProber(probe)), runner.clone(), None).unwrap();
    let result = converter.convert(&input).await;

    assert!(result.success);
    assert_eq!(result.output, Some(temp.path().join("episode_converted.mkv")));
    assert!(input.exists());
}

/// Panics on one file, succeeds on the rest
struct PanickyConverter;

#[async_trait]
impl ConvertFile for PanickyConverter {
    async fn convert(&self, path: &Path) -> ConversionResult {
        tokio::task::yield_now().await;
        if path.ends_with("c.avi") {
            panic!("unexpected state in worker");
        }
        ConversionResult::succeeded(path, path.with_extension("mkv"), false, None)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batch_isolates_a_panicking_task() {
    let files: Vec<PathBuf> = ["a.avi", "b.avi", "c.avi", "d.avi"].iter().map(PathBuf::from).collect();
    let batch = BatchConverter::new(Arc::new(PanickyConverter), 2);
    let mut callbacks: HashMap<PathBuf, usize> = HashMap::new();

    let summary = batch
        .run(files.clone(), |result| {
            *callbacks.entry(result.path.clone()).or_default() += 1;
        })
        .await;

    assert_eq!(summary.successful, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(callbacks.len(), 4);
    for file in &files {
        assert_eq!(callbacks.get(file), Some(&1), "callback count for {}", file.display());
    }
}
