//! Enumeration of the extracted tree.
//!
//! Includes:
//! - `keep_entry`: the junk filter shared by file enumeration and directory
//!   mirroring, so both always agree on what exists.
//! - `enumerate_files`: every regular file to process, junk removed.
//! - `mirror_directory_tree`: recreate the kept folder structure (empty
//!   directories included) under the output root.

use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::constant::{APPLE_DOUBLE_PREFIX, FINDER_METADATA_FILE, RESOURCE_FORK_DIR};

/// One file slated for processing: where it sits in the extraction tree and
/// its archive-relative path, which the output tree reuses as-is.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub source: PathBuf,
    pub relative: PathBuf,
}

/// False for bundler junk: `__MACOSX` prunes the whole subtree, AppleDouble
/// sidecars and Finder metadata are dropped per file.
pub fn keep_entry(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name == RESOURCE_FORK_DIR {
        return false;
    }
    if entry.file_type().is_file() {
        return !name.starts_with(APPLE_DOUBLE_PREFIX) && name != FINDER_METADATA_FILE;
    }
    true
}

/// Walk the extraction root and yield every kept regular file. Unreadable
/// entries are logged and skipped rather than aborting the batch.
pub fn enumerate_files(root: &Path) -> impl Iterator<Item = FileEntry> + '_ {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(keep_entry)
        .filter_map(|result| match result {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(move |entry| {
            let relative = entry.path().strip_prefix(root).ok()?.to_path_buf();
            Some(FileEntry {
                source: entry.into_path(),
                relative,
            })
        })
}

/// Recreate every kept directory of `src_root` under `dest_root` so the
/// result archive preserves the input layout, empty folders included.
pub fn mirror_directory_tree(src_root: &Path, dest_root: &Path) -> Result<()> {
    for result in WalkDir::new(src_root).into_iter().filter_entry(keep_entry) {
        let entry = result.context("failed to walk the extraction tree")?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(src_root)
            .context("directory escaped the extraction root")?;
        let target = dest_root.join(relative);
        fs::create_dir_all(&target)
            .with_context(|| format!("failed to create directory {:?}", target))?;
    }
    Ok(())
}
