//! Video uniquification through ffmpeg.
//!
//! Includes:
//! - `FilterParams`: the randomized knobs and the filter graphs built from
//!   them.
//! - `uniquify_video`: run ffmpeg with a bounded runtime, then verify that it
//!   actually produced a playable file before reporting success.

use anyhow::{Context, Result, bail};
use log::warn;
use rand::Rng;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::constant::{VIDEO_CROP_RANGE, VIDEO_EQ_RANGE, VOLUME_RANGE};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Randomized filter knobs for one encode, each rounded to two decimals so
/// the generated filter graph stays short and reproducible in logs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub contrast: f32,
    pub saturation: f32,
    pub gamma: f32,
    pub volume: f32,
    pub crop_factor: f32,
}

impl FilterParams {
    pub fn sample() -> Self {
        let mut rng = rand::rng();
        Self {
            contrast: round2(rng.random_range(VIDEO_EQ_RANGE)),
            saturation: round2(rng.random_range(VIDEO_EQ_RANGE)),
            gamma: round2(rng.random_range(VIDEO_EQ_RANGE)),
            volume: round2(rng.random_range(VOLUME_RANGE)),
            crop_factor: round2(rng.random_range(VIDEO_CROP_RANGE)),
        }
    }

    /// Video graph: crop a border off the frame, scale back near the source
    /// size (snapped to even for the encoder), nudge the eq knobs, then add
    /// temporal+uniform noise so no two frames ever match the source.
    pub fn video_filter(&self) -> String {
        format!(
            "crop=iw*{cf}:ih*{cf},scale=trunc(iw/{cf}/2)*2:trunc(ih/{cf}/2)*2,\
             eq=contrast={}:saturation={}:gamma={},noise=alls=1:allf=t+u",
            self.contrast,
            self.saturation,
            self.gamma,
            cf = self.crop_factor
        )
    }

    pub fn audio_filter(&self) -> String {
        format!("volume={}", self.volume)
    }
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Re-encode the video at `source` into a perturbed copy at `dest`, dropping
/// container metadata. Fails if ffmpeg is missing, exits non-zero, exceeds
/// `timeout`, or leaves an empty or unreadable file behind.
pub fn uniquify_video(source: &Path, dest: &Path, timeout: Duration) -> Result<()> {
    let params = FilterParams::sample();
    let mut command = create_silent_ffmpeg_command();
    command
        .arg("-y")
        .arg("-i")
        .arg(source)
        .arg("-vf")
        .arg(params.video_filter())
        .arg("-af")
        .arg(params.audio_filter())
        .args(["-map_metadata", "-1"])
        .args(["-c:v", "libx264", "-preset", "ultrafast"])
        .args(["-c:a", "aac"])
        .arg(dest);

    let mut child = command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn ffmpeg for {:?}", source))?;
    let status = wait_with_timeout(&mut child, timeout)
        .with_context(|| format!("ffmpeg did not finish for {:?}", source))?;
    if !status.success() {
        bail!(
            "ffmpeg exited with code {} for {:?}",
            status.code().unwrap_or(-1),
            source
        );
    }
    verify_encoded_output(dest)
}

/// Base ffmpeg invocation with all terminal noise suppressed.
fn create_silent_ffmpeg_command() -> Command {
    let mut command = Command::new("ffmpeg");
    command.args(["-v", "quiet", "-hide_banner", "-nostats", "-nostdin"]);
    command
}

/// Poll the child until it exits or the deadline passes; a timed-out encoder
/// is killed and reaped before the error is returned.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child
            .try_wait()
            .context("failed to poll the encoder process")?
        {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            child.kill().context("failed to kill the stalled encoder")?;
            child.wait().context("failed to reap the stalled encoder")?;
            bail!("encoder timed out after {:?}", timeout);
        }
        sleep(WAIT_POLL_INTERVAL);
    }
}

/// An exit code of zero is not enough: the output must exist, be non-empty,
/// and parse as a media container.
fn verify_encoded_output(dest: &Path) -> Result<()> {
    let size = fs::metadata(dest)
        .with_context(|| format!("encoder produced no output at {:?}", dest))?
        .len();
    if size == 0 {
        bail!("encoder produced an empty file at {:?}", dest);
    }
    probe_container(dest)
}

/// Ask ffprobe for the container duration. A missing ffprobe downgrades the
/// check to a warning so the batch can still run on minimal installs.
fn probe_container(path: &Path) -> Result<()> {
    let result = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output();
    let output = match result {
        Ok(output) => output,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!("ffprobe is not installed; skipping container verification for {:?}", path);
            return Ok(());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to run ffprobe on {:?}", path));
        }
    };
    if output.status.success() {
        Ok(())
    } else {
        bail!(
            "encoded file {:?} is not a readable container: {}",
            path,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampled_params_stay_in_bounds_at_two_decimals() {
        for _ in 0..200 {
            let params = FilterParams::sample();
            for value in [params.contrast, params.saturation, params.gamma] {
                assert!((0.96..=1.04).contains(&value), "eq knob out of bounds: {value}");
            }
            assert!((0.95..=1.05).contains(&params.volume));
            assert!((0.98..=0.99).contains(&params.crop_factor));
            for value in [
                params.contrast,
                params.saturation,
                params.gamma,
                params.volume,
                params.crop_factor,
            ] {
                let scaled = value * 100.0;
                assert!(
                    (scaled - scaled.round()).abs() < 1e-4,
                    "not rounded to two decimals: {value}"
                );
            }
        }
    }

    #[test]
    fn filter_graph_lists_the_stages_in_order() {
        let params = FilterParams {
            contrast: 0.97,
            saturation: 1.02,
            gamma: 1.0,
            volume: 1.05,
            crop_factor: 0.98,
        };
        assert_eq!(
            params.video_filter(),
            "crop=iw*0.98:ih*0.98,scale=trunc(iw/0.98/2)*2:trunc(ih/0.98/2)*2,\
             eq=contrast=0.97:saturation=1.02:gamma=1,noise=alls=1:allf=t+u"
        );
        assert_eq!(params.audio_filter(), "volume=1.05");
    }

    #[test]
    fn garbage_input_never_yields_success() {
        // fails on spawn when ffmpeg is missing, on exit code when it is not
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        fs::write(&source, b"certainly not a video stream").unwrap();
        let result = uniquify_video(&source, &dir.path().join("out.mp4"), Duration::from_secs(60));
        assert!(result.is_err());
    }

    #[test]
    fn stalled_children_are_killed_at_the_deadline() {
        let spawned = Command::new("sleep").arg("5").spawn();
        let Ok(mut child) = spawned else {
            return;
        };
        let started = Instant::now();
        let result = wait_with_timeout(&mut child, Duration::from_millis(200));
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn an_empty_output_file_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp4");
        fs::write(&dest, b"").unwrap();
        assert!(verify_encoded_output(&dest).is_err());
        assert!(verify_encoded_output(&dir.path().join("missing.mp4")).is_err());
    }
}
