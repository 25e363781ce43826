//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file e la discovery dei video.
//!
//! ## Responsabilità:
//! - Discovery di file video in directory (ricorsiva con `-r`)
//! - Validazione dei file di input (esistenza, leggibilità, estensione)
//! - Archiviazione degli originali nella directory `originals`
//! - Formattazione human-readable delle dimensioni e spazio libero su disco
//!
//! ## Formati supportati:
//! AVI, MPG, MPEG, WMV, MOV, MP4, MKV (estensione case-insensitive)
//!
//! ## Archiviazione:
//! - `rename` nella directory di archivio, creata se manca
//! - Un originale già archiviato con lo stesso nome non viene mai sovrascritto
//! - Fallback copia + rimozione quando il rename attraversa filesystem
//!
//! ## Esempio:
//! ```ignore
//! let files = FileManager::find_video_files(Path::new("/videos"), true)?;
//! for file in files {
//!     FileManager::validate_file(&file).await?;
//! }
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ConvertError;

/// Supported input extensions, lowercase
pub const SUPPORTED_EXTENSIONS: &[&str] = &["avi", "mpg", "mpeg", "wmv", "mov", "mp4", "mkv"];

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Find all supported video files in a directory, sorted by path
    pub fn find_video_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(ConvertError::Validation(format!("not a directory: {}", dir.display())).into());
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| Self::is_supported_format(p))
            .collect();

        files.sort();
        debug!("Found {} video files in {}", files.len(), dir.display());
        Ok(files)
    }

    /// Check if a file extension is supported
    pub fn is_supported_format(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Check that `path` is an existing, readable file of a supported type
    pub async fn validate_file(path: &Path) -> Result<()> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|_| ConvertError::Validation(format!("path does not exist: {}", path.display())))?;

        if !metadata.is_file() {
            return Err(ConvertError::Validation(format!("not a regular file: {}", path.display())).into());
        }

        if let Err(e) = fs::File::open(path).await {
            return Err(ConvertError::Validation(format!("file is not readable: {} ({})", path.display(), e)).into());
        }

        if !Self::is_supported_format(path) {
            let ext = path.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
            return Err(ConvertError::Validation(format!(
                "unsupported file type: .{} (supported: {})",
                ext,
                SUPPORTED_EXTENSIONS.join(", ")
            ))
            .into());
        }

        Ok(())
    }

    /// Move `original` into `originals_dir`, returning its new path
    pub async fn archive_original(original: &Path, originals_dir: &Path) -> Result<PathBuf> {
        let file_name = original
            .file_name()
            .ok_or_else(|| ConvertError::Archive(format!("no file name in {}", original.display())))?;

        fs::create_dir_all(originals_dir).await.map_err(|e| {
            ConvertError::Archive(format!("cannot create {}: {}", originals_dir.display(), e))
        })?;

        let destination = originals_dir.join(file_name);
        if fs::try_exists(&destination).await.unwrap_or(true) {
            return Err(ConvertError::Archive(format!(
                "{} already exists, keeping {} in place",
                destination.display(),
                original.display()
            ))
            .into());
        }

        if fs::rename(original, &destination).await.is_ok() {
            return Ok(destination);
        }

        // Cross-device moves need copy + delete
        warn!("Rename failed for {}, falling back to copy", original.display());
        fs::copy(original, &destination).await.map_err(|e| {
            ConvertError::Archive(format!("cannot copy {} to {}: {}", original.display(), destination.display(), e))
        })?;
        fs::remove_file(original).await.map_err(|e| {
            ConvertError::Archive(format!("copied but cannot remove {}: {}", original.display(), e))
        })?;

        Ok(destination)
    }

    /// Size of a file in bytes
    pub async fn file_size(path: &Path) -> Result<u64> {
        Ok(fs::metadata(path).await?.len())
    }

    /// Free space on the filesystem holding `path`, `None` when it cannot be read
    pub fn free_space(path: &Path) -> Option<u64> {
        fs2::available_space(path)
            .map_err(|e| debug!("Cannot read free space for {}: {}", path.display(), e))
            .ok()
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
