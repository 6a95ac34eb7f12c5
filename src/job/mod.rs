//! Batch orchestration.
//!
//! Includes:
//! - `JobOptions` / `JobSummary`: the knobs going in and the report coming
//!   out of one run.
//! - `run_job`: ingest the input archives, transform every extracted file
//!   through a worker pool, and package the output tree into the result
//!   archive. Working trees live under job-scoped temporary roots, so
//!   concurrent jobs never collide.

pub mod tally;
pub mod walk;

use anyhow::{Context, Result, ensure};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use crate::archive;
use crate::processors;
use crate::utils::suffixed_file_name;
use tally::{Outcome, Tally, TallySummary};
use walk::FileEntry;

/// Knobs for one batch run.
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Append a random token to every output filename.
    pub rename: bool,
    /// Worker threads for the transform stage; 0 means one per CPU core.
    pub jobs: usize,
    /// Hard cap on a single encoder invocation.
    pub encoder_timeout: Duration,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            rename: false,
            jobs: 1,
            encoder_timeout: Duration::from_secs(300),
        }
    }
}

/// What one finished job reports back.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: String,
    pub archives_submitted: usize,
    pub archives_ingested: usize,
    pub tally: TallySummary,
}

/// Job-scoped working trees. Both roots carry the job token in their name
/// and are removed when the job ends, on the error paths included.
struct JobContext {
    id: String,
    extract_root: TempDir,
    output_root: TempDir,
}

impl JobContext {
    fn create() -> Result<Self> {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);
        let extract_root = tempfile::Builder::new()
            .prefix(&format!("remint-{id}-in-"))
            .tempdir()
            .context("failed to create the extraction root")?;
        let output_root = tempfile::Builder::new()
            .prefix(&format!("remint-{id}-out-"))
            .tempdir()
            .context("failed to create the output root")?;
        Ok(Self {
            id,
            extract_root,
            output_root,
        })
    }

    /// Explicit teardown after success; failures only warn.
    fn cleanup(self) {
        let id = self.id;
        for root in [self.extract_root, self.output_root] {
            let path = root.path().to_path_buf();
            if let Err(err) = root.close() {
                warn!("job {}: failed to remove {:?}: {}", id, path, err);
            }
        }
    }
}

/// Run one batch end to end and return its summary. Unreadable archives and
/// failed transforms are logged and counted but never abort the run; only
/// infrastructure failures (no temp space, unwritable result path) do.
pub fn run_job(archives: &[PathBuf], output: &Path, options: &JobOptions) -> Result<JobSummary> {
    ensure!(!archives.is_empty(), "no input archives given");
    let ctx = JobContext::create()?;
    info!("job {}: processing {} archive(s)", ctx.id, archives.len());

    let ingested = ingest_archives(&ctx, archives);
    if ingested == 0 {
        warn!("job {}: no input archive could be read", ctx.id);
    }

    let files: Vec<FileEntry> = walk::enumerate_files(ctx.extract_root.path()).collect();
    if files.is_empty() {
        warn!("job {}: nothing to process, packaging an empty result", ctx.id);
    }

    walk::mirror_directory_tree(ctx.extract_root.path(), ctx.output_root.path())
        .context("failed to mirror the directory structure")?;

    let tally = Tally::default();
    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("[{bar:40}] {pos}/{len} {msg}")
            .expect("static progress template")
            .progress_chars("=> "),
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs)
        .thread_name(|index| format!("transform-worker-{index}"))
        .build()
        .context("failed to build the transform worker pool")?;
    pool.install(|| {
        files.par_iter().for_each(|entry| {
            let outcome = transform_entry(entry, ctx.output_root.path(), options);
            tally.record(outcome);
            progress.inc(1);
        });
    });
    progress.finish_and_clear();

    archive::pack_zip(ctx.output_root.path(), output)
        .context("failed to package the result archive")?;

    let summary = JobSummary {
        job_id: ctx.id.clone(),
        archives_submitted: archives.len(),
        archives_ingested: ingested,
        tally: tally.snapshot(),
    };
    debug_assert!(summary.tally.is_balanced());
    info!("job {}: result written to {:?}", summary.job_id, output);
    ctx.cleanup();
    Ok(summary)
}

/// Extract every input archive. A single archive extracts flat into the
/// root; several each get their own subfolder named after the archive.
/// Returns how many archives were actually readable.
fn ingest_archives(ctx: &JobContext, archives: &[PathBuf]) -> usize {
    let extract_root = ctx.extract_root.path();
    let mut ingested = 0;
    for path in archives {
        let dest = if archives.len() == 1 {
            extract_root.to_path_buf()
        } else {
            unique_subfolder(extract_root, &archive::sanitize_archive_stem(path))
        };
        match archive::extract_zip(path, &dest) {
            Ok(entries) => {
                info!("job {}: extracted {} entries from {:?}", ctx.id, entries, path);
                ingested += 1;
            }
            Err(err) => error!("job {}: skipping archive {:?}: {:#}", ctx.id, path, err),
        }
    }
    ingested
}

/// First free folder for a stem: `name`, then `name-2`, `name-3`, …
fn unique_subfolder(root: &Path, stem: &str) -> PathBuf {
    let mut candidate = root.join(stem);
    let mut counter = 1;
    while candidate.exists() {
        counter += 1;
        candidate = root.join(format!("{stem}-{counter}"));
    }
    candidate
}

fn transform_entry(entry: &FileEntry, output_root: &Path, options: &JobOptions) -> Outcome {
    let mut dest = output_root.join(&entry.relative);
    if options.rename {
        if let Some(name) = dest.file_name().and_then(|n| n.to_str()) {
            dest.set_file_name(suffixed_file_name(name));
        }
    }
    processors::process_file(&entry.source, &dest, options.encoder_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn subfolder_names_dodge_existing_ones() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(
            unique_subfolder(root.path(), "holiday"),
            root.path().join("holiday")
        );
        fs::create_dir(root.path().join("holiday")).unwrap();
        assert_eq!(
            unique_subfolder(root.path(), "holiday"),
            root.path().join("holiday-2")
        );
        fs::create_dir(root.path().join("holiday-2")).unwrap();
        assert_eq!(
            unique_subfolder(root.path(), "holiday"),
            root.path().join("holiday-3")
        );
    }

    #[test]
    fn job_context_roots_are_namespaced_and_distinct() {
        let ctx = JobContext::create().unwrap();
        assert_eq!(ctx.id.len(), 8);
        let folder_name = |dir: &TempDir| {
            dir.path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        };
        let extract_name = folder_name(&ctx.extract_root);
        let output_name = folder_name(&ctx.output_root);
        assert!(extract_name.contains(&ctx.id), "{extract_name}");
        assert!(output_name.contains(&ctx.id), "{output_name}");
        assert_ne!(ctx.extract_root.path(), ctx.output_root.path());
        ctx.cleanup();
    }

    #[test]
    fn empty_input_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_job(&[], &dir.path().join("out.zip"), &JobOptions::default());
        assert!(result.is_err());
    }
}
