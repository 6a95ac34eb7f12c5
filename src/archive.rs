//! ZIP ingestion and packaging.
//!
//! Includes:
//! - `extract_zip`: unpack one input archive into a destination folder.
//! - `pack_zip`: package a finished output tree into the result archive,
//!   entry paths relative and forward-slashed.
//! - `sanitize_archive_stem`: archive name to a safe subfolder / stem.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Unpack `archive_path` into `dest`, creating it if needed. Returns the
/// number of entries the archive declared. Entry paths are validated by the
/// extraction itself, so `../` escapes never leave `dest`.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open archive {:?}", archive_path))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("{:?} is not a valid zip archive", archive_path))?;
    fs::create_dir_all(dest)
        .with_context(|| format!("failed to create extraction folder {:?}", dest))?;
    let entries = archive.len();
    archive
        .extract(dest)
        .with_context(|| format!("failed to extract {:?}", archive_path))?;
    Ok(entries)
}

/// Package everything under `src_root` into a ZIP at `dest`. Directories are
/// written explicitly so empty folders survive the round trip.
pub fn pack_zip(src_root: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create output folder {:?}", parent))?;
        }
    }
    let file =
        File::create(dest).with_context(|| format!("failed to create archive {:?}", dest))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for result in WalkDir::new(src_root).min_depth(1).sort_by_file_name() {
        let entry = result.context("failed to walk the output tree")?;
        let relative = entry
            .path()
            .strip_prefix(src_root)
            .context("entry escaped the output root")?;
        let name = zip_entry_name(relative);
        if entry.file_type().is_dir() {
            writer
                .add_directory(name, options)
                .with_context(|| format!("failed to add directory entry {:?}", relative))?;
        } else {
            writer
                .start_file(name, options)
                .with_context(|| format!("failed to start entry {:?}", relative))?;
            let mut source = File::open(entry.path())
                .with_context(|| format!("failed to open {:?}", entry.path()))?;
            io::copy(&mut source, &mut writer)
                .with_context(|| format!("failed to write entry {:?}", relative))?;
        }
    }

    writer
        .finish()
        .with_context(|| format!("failed to finish archive {:?}", dest))?;
    Ok(())
}

/// ZIP entry names always use forward slashes, whatever the host separator.
fn zip_entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Reduce an archive filename to a stem safe to reuse as a folder or output
/// name: alphanumerics plus `.`, `_`, `-`, and spaces survive, everything
/// else is dropped. An empty result falls back to `archive`.
pub fn sanitize_archive_stem(archive_path: &Path) -> String {
    let stem = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        "archive".to_owned()
    } else {
        cleaned
    }
}
