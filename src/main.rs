//! # Legacy Video Converter - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del logging con `tracing` (console + log di sessione)
//! - Caricamento della configurazione (file JSON + flag CLI)
//! - Discovery dei file e avvio del batch
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO o DEBUG, `RUST_LOG` ha precedenza)
//! 3. Carica e valida la configurazione
//! 4. Singolo file o directory (ricorsiva con `-r`)
//! 5. Converte, stampa il riepilogo, exit code 0 solo se tutti i file riescono
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-converter /path/to/videos -r --workers 2 -o /path/to/output
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use legacy_video_converter::file_manager::FileManager;
use legacy_video_converter::json_output::JsonMessage;
use legacy_video_converter::tool_resolver::ToolPathResolver;
use legacy_video_converter::{BatchConverter, Config, FileConverter, ReportMode, SystemToolRunner};

#[derive(Parser)]
#[command(name = "media-converter")]
#[command(about = "Repair and convert legacy video files to H.264/AAC Matroska")]
struct Args {
    /// Video file or directory to convert
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Output directory for converted files (default: next to each input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Scan subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Keep original files (don't move them to the originals directory)
    #[arg(short, long)]
    keep_original: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Probe and decide, but don't write anything
    #[arg(long)]
    dry_run: bool,

    /// Convert one file at a time
    #[arg(long)]
    no_parallel: bool,

    /// Number of parallel workers (default: 4 or CONVERTER_MAX_WORKERS)
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Skip episode metadata lookup
    #[arg(long)]
    no_metadata: bool,

    /// Output progress and results as JSON lines
    #[arg(long)]
    json: bool,

    /// Load settings from a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report external tool availability and exit
    #[arg(long)]
    check_tools: bool,
}

impl Args {
    /// Overlay command line flags on a base configuration
    fn apply_to(&self, mut config: Config) -> Config {
        if self.output.is_some() {
            config.output_path = self.output.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.recursive |= self.recursive;
        config.keep_original |= self.keep_original;
        config.dry_run |= self.dry_run;
        config.no_metadata |= self.no_metadata;
        config.json_output |= self.json;
        if self.no_parallel {
            config.parallel = false;
        }
        if self.no_progress || self.json {
            config.show_progress = false;
        }
        config
    }
}

/// Console layer on stderr plus an optional session log file
fn init_logging(verbose: bool, session_log: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match session_log {
        Some(path) => {
            let dir = path.parent().unwrap_or(Path::new("."));
            std::fs::create_dir_all(dir)?;
            let file_name = path.file_name().unwrap_or_default();
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

fn session_log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("session_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S")))
}

async fn run(args: Args) -> Result<ExitCode> {
    let base = match args.config {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    let config = args.apply_to(base);

    let session_log = (!config.dry_run && !args.check_tools).then(|| session_log_path(&config.log_dir));
    let _guard = init_logging(args.verbose, session_log.as_deref())?;

    let resolver = ToolPathResolver::new();
    if args.check_tools {
        println!("{}", resolver.tools_report());
        return Ok(if resolver.missing_tools().is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    config.validate()?;

    for tool in resolver.missing_tools() {
        warn!("{} not found, install with: {}", tool, ToolPathResolver::install_hint(tool));
    }

    if !args.path.exists() {
        return Err(anyhow::anyhow!("Path does not exist: {}", args.path.display()));
    }
    let files = if args.path.is_dir() {
        FileManager::find_video_files(&args.path, config.recursive)?
    } else {
        vec![args.path.clone()]
    };

    if let Some(ref output_dir) = config.output_path {
        if !config.dry_run && !output_dir.exists() {
            std::fs::create_dir_all(output_dir)?;
            info!("Created output directory: {}", output_dir.display());
        }
    }

    if config.json_output {
        JsonMessage::start(args.path.clone(), config.output_path.clone(), files.len(), &config).emit();
    } else {
        info!("Starting conversion of {} files in: {}", files.len(), args.path.display());
        if config.dry_run {
            info!("Dry run mode: No files will be modified");
        }
    }

    let start_time = Instant::now();
    let report_mode = if config.json_output {
        ReportMode::Json
    } else if config.show_progress {
        ReportMode::Bar
    } else {
        ReportMode::Quiet
    };

    let runner = Arc::new(SystemToolRunner::new(resolver));
    let workers = config.effective_workers(files.len());
    let converter = FileConverter::new(config.clone(), runner)?;
    let batch = BatchConverter::new(Arc::new(converter), workers).with_report_mode(report_mode);

    let mut failures = Vec::new();
    let summary = batch
        .run(files, |result| {
            if let Some(ref error) = result.error {
                failures.push(format!("{}: {}", result.path.display(), error));
            }
        })
        .await;

    if config.json_output {
        JsonMessage::complete(&summary, start_time.elapsed().as_secs_f64()).emit();
    } else {
        for failure in &failures {
            eprintln!("❌ {}", failure);
        }
        let log_dir = session_log.as_ref().and_then(|p| p.parent());
        let free_space = FileManager::free_space(Path::new("."));
        println!(
            "{}",
            summary.format_summary(free_space, log_dir, &config.originals_dir, &config.scratch_dir)
        );
    }

    Ok(if summary.all_succeeded() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let json = args.json;

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            if json {
                JsonMessage::error(e.to_string(), Some(format!("{:#}", e))).emit();
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}
