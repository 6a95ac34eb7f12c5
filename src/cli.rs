//! Command-line surface.

use clap::Parser;
use std::path::PathBuf;

/// Rewrite the media inside ZIP archives into visually identical but
/// byte-distinct copies, then repackage everything into one result archive.
#[derive(Parser, Debug)]
#[command(name = "remint", version, about)]
pub struct Cli {
    /// Input ZIP archives; each is unpacked, transformed, and repackaged
    #[arg(required = true)]
    pub archives: Vec<PathBuf>,

    /// Where to write the result archive. Defaults to `<first input
    /// stem>-unique.zip`, or `unique-bundle.zip` for multiple inputs
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Append a short random token to every output filename
    #[arg(long)]
    pub rename: bool,

    /// Files to transform in parallel (0 = one worker per CPU core)
    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    /// Seconds to wait for a single ffmpeg invocation before killing it
    #[arg(long, default_value_t = 300)]
    pub encoder_timeout: u64,

    /// Print the final tally as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Result path: `--output` when given, otherwise derived from the inputs.
    pub fn output_path(&self) -> PathBuf {
        if let Some(path) = &self.output {
            return path.clone();
        }
        if let [only] = self.archives.as_slice() {
            let stem = only
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("result");
            PathBuf::from(format!("{stem}-unique.zip"))
        } else {
            PathBuf::from("unique-bundle.zip")
        }
    }
}
