use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use std::time::Duration;

use remint::cli::Cli;
use remint::job::{JobOptions, run_job};
use remint::setup::{check_ffmpeg_and_ffprobe, initialize_logger};

fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logger();
    check_ffmpeg_and_ffprobe();

    let options = JobOptions {
        rename: cli.rename,
        jobs: cli.jobs,
        encoder_timeout: Duration::from_secs(cli.encoder_timeout),
    };
    let output = cli.output_path();
    let summary = run_job(&cli.archives, &output, &options)?;

    let tally = summary.tally;
    info!(
        "done: {} file(s), {} transformed, {} copied after a failed transform, {} passed through",
        tally.total, tally.success, tally.errors, tally.skipped
    );
    if summary.archives_ingested < summary.archives_submitted {
        warn!(
            "{} of {} archive(s) could not be read and were left out",
            summary.archives_submitted - summary.archives_ingested,
            summary.archives_submitted
        );
    }
    if tally.errors > 0 {
        warn!("{} file(s) kept their original bytes; see the log above", tally.errors);
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&tally)?);
    }
    Ok(())
}
