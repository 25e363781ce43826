//! # Batch Converter
//!
//! Orchestratore del batch: pool di worker limitato e aggregatore unico.
//!
//! ## Modello:
//! - Un task per file, concorrenza limitata da un `Semaphore` (`workers`)
//! - Ogni conversione gira in un task figlio: un panic diventa un risultato
//!   fallito solo per quel file, i file fratelli proseguono
//! - I risultati viaggiano su un canale `mpsc` verso un solo aggregatore che
//!   possiede il `ConversionSummary`, la progress bar e la callback per file
//! - Nessuna cancellazione dei processi in corso
//!
//! ## Collisioni di stem:
//! I nomi dei file riparati e archiviati derivano dallo stem. Un file che
//! condivide lo stem con uno precedente nel batch non viene convertito e
//! riceve un risultato di validazione fallita che nomina la collisione.
//! Il confronto ignora maiuscole e minuscole.

use futures::future::join_all;
use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info};

use crate::converter::file_converter::ConvertFile;
use crate::converter::progress_tracker::{ProgressTracker, ReportMode};
use crate::progress::{ConversionResult, ConversionSummary};
use crate::utils::stem_of;

/// Runs many conversions on a bounded worker pool
pub struct BatchConverter {
    converter: Arc<dyn ConvertFile>,
    workers: usize,
    report_mode: ReportMode,
}

impl BatchConverter {
    pub fn new(converter: Arc<dyn ConvertFile>, workers: usize) -> Self {
        Self {
            converter,
            workers: workers.max(1),
            report_mode: ReportMode::Quiet,
        }
    }

    pub fn with_report_mode(mut self, mode: ReportMode) -> Self {
        self.report_mode = mode;
        self
    }

    /// Convert every file; `on_file` fires exactly once per input file
    pub async fn run<F>(&self, files: Vec<PathBuf>, mut on_file: F) -> ConversionSummary
    where
        F: FnMut(&ConversionResult),
    {
        let mut summary = ConversionSummary::new();
        let mut tracker = ProgressTracker::new(files.len(), self.report_mode);
        let (accepted, collisions) = partition_stem_collisions(files);

        let workers = self.workers.min(accepted.len()).max(1);
        info!("Converting {} files with {} workers", accepted.len(), workers);

        for result in collisions {
            summary.record(&result);
            on_file(&result);
            tracker.handle_file_completion(&result);
        }

        let semaphore = Arc::new(Semaphore::new(workers));
        let (tx, mut rx) = mpsc::channel::<ConversionResult>(accepted.len().max(1));

        let mut handles = Vec::with_capacity(accepted.len());
        for path in accepted {
            let semaphore = semaphore.clone();
            let converter = self.converter.clone();
            let tx = tx.clone();
            let task_path = path.clone();

            let handle = tokio::spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => convert_isolated(converter, task_path.clone()).await,
                    Err(e) => ConversionResult::failed(&task_path, "internal", format!("worker pool closed: {}", e)),
                };
                let _ = tx.send(result).await;
            });
            handles.push((path, handle));
        }
        drop(tx);

        let mut reported: HashMap<PathBuf, usize> = HashMap::new();
        while let Some(result) = rx.recv().await {
            *reported.entry(result.path.clone()).or_default() += 1;
            summary.record(&result);
            on_file(&result);
            tracker.handle_file_completion(&result);
        }

        // A worker that died before sending still owes its file a verdict
        let (paths, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        for (path, joined) in paths.into_iter().zip(join_all(handles).await) {
            if let Err(e) = joined {
                if reported.get(&path).copied().unwrap_or(0) == 0 {
                    error!("Worker for {} died: {}", path.display(), e);
                    let result = ConversionResult::failed(&path, "internal", format!("worker died: {}", e));
                    summary.record(&result);
                    on_file(&result);
                    tracker.handle_file_completion(&result);
                }
            }
        }

        tracker.finish(&summary);
        summary
    }
}

/// Run one conversion in its own task so a panic only fails that file
async fn convert_isolated(converter: Arc<dyn ConvertFile>, path: PathBuf) -> ConversionResult {
    let task_path = path.clone();
    match tokio::spawn(async move { converter.convert(&task_path).await }).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let message = panic_message(e.into_panic());
            error!("Conversion of {} panicked: {}", path.display(), message);
            ConversionResult::failed(&path, "internal", format!("conversion panicked: {}", message))
        }
        Err(e) => ConversionResult::failed(&path, "internal", format!("conversion cancelled: {}", e)),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Split files into those safe to run and failed results for stem collisions.
///
/// Stems compare case-insensitively: `Show.avi` and `show.mpg` share a
/// scratch file on case-insensitive filesystems.
pub fn partition_stem_collisions(files: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<ConversionResult>) {
    let mut first_by_stem: HashMap<String, PathBuf> = HashMap::new();
    let mut accepted = Vec::with_capacity(files.len());
    let mut collisions = Vec::new();

    for path in files {
        let stem = stem_of(&path).to_lowercase();
        match first_by_stem.get(&stem) {
            Some(first) => {
                debug!("Stem collision: {} vs {}", path.display(), first.display());
                collisions.push(collision_result(&path, first));
            }
            None => {
                first_by_stem.insert(stem, path.clone());
                accepted.push(path);
            }
        }
    }

    (accepted, collisions)
}

fn collision_result(path: &Path, first: &Path) -> ConversionResult {
    ConversionResult::failed(
        path,
        "validate",
        format!(
            "file stem collides with {} in this batch; convert it separately",
            first.display()
        ),
    )
}
