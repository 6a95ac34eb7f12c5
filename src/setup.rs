//! Startup tasks.
//!
//! Includes:
//! - Logger initialization
//! - FFmpeg/FFprobe availability check

use env_logger::Builder;
use log::{LevelFilter, error, info, warn};
use std::io::Write;
use std::process::Command;

// ────────────────────────────────────────────────────────────────
// Logger Initialization
// ────────────────────────────────────────────────────────────────

/// Initialize the logger: compact `timestamp level message` lines on stderr,
/// Info and up by default, `RUST_LOG` overrides.
pub fn initialize_logger() {
    Builder::new()
        .format(|buf, record| {
            let ts = buf.timestamp();
            writeln!(buf, "{} {:<5} {}", ts, record.level(), record.args())
        })
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}

// ────────────────────────────────────────────────────────────────
// FFmpeg Check
// ────────────────────────────────────────────────────────────────

/// Check if ffmpeg and ffprobe are available in PATH
pub fn check_ffmpeg_and_ffprobe() {
    for command in &["ffmpeg", "ffprobe"] {
        match Command::new(command).arg("-version").output() {
            Ok(output) if output.status.success() => {
                let version_info = String::from_utf8_lossy(&output.stdout);
                let version_number = version_info
                    .lines()
                    .next()
                    .unwrap_or("Unknown version")
                    .split_whitespace()
                    .nth(2)
                    .unwrap_or("Unknown");
                info!("{} version: {}", command, version_number);
            }
            Ok(_) => {
                error!(
                    "`{}` command was found, but it returned an error. Videos will be copied verbatim.",
                    command
                );
            }
            Err(_) => {
                warn!(
                    "`{}` is not installed or not available in PATH. Videos will be copied verbatim.",
                    command
                );
            }
        }
    }
}
