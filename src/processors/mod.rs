//! Per-file transform dispatch.
//!
//! Includes:
//! - `MediaKind`: extension-based routing to the image or video transform.
//! - `process_file`: transform one file into the output tree, falling back
//!   to a verbatim copy whenever the transform fails. The batch never loses
//!   a file because one transform misbehaved.

pub mod image;
pub mod video;

use log::{error, warn};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::constant::{VALID_IMAGE_EXTENSIONS, VALID_VIDEO_EXTENSIONS};
use crate::job::tally::Outcome;
use crate::utils::PathExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path.ext_lower();
        if VALID_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Image
        } else if VALID_VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Video
        } else {
            Self::Other
        }
    }
}

/// Handle one file. Media files are transformed; anything else is copied
/// through untouched and counted as skipped.
pub fn process_file(source: &Path, dest: &Path, encoder_timeout: Duration) -> Outcome {
    match MediaKind::from_path(source) {
        MediaKind::Image => match image::uniquify_image(source, dest) {
            Ok(()) => Outcome::Transformed,
            Err(err) => copy_verbatim(source, dest, err),
        },
        MediaKind::Video => match video::uniquify_video(source, dest, encoder_timeout) {
            Ok(()) => Outcome::Transformed,
            Err(err) => copy_verbatim(source, dest, err),
        },
        MediaKind::Other => match fs::copy(source, dest) {
            Ok(_) => Outcome::Skipped,
            Err(err) => {
                error!("failed to copy {:?}: {}", source, err);
                Outcome::Fallback
            }
        },
    }
}

/// A failed transform keeps its source: log the chain, copy the original
/// bytes, and count the file under errors. A partial transform output at
/// `dest` is overwritten by the copy.
fn copy_verbatim(source: &Path, dest: &Path, err: anyhow::Error) -> Outcome {
    warn!("transform failed for {:?}, copying verbatim: {:#}", source, err);
    if let Err(copy_err) = fs::copy(source, dest) {
        error!("fallback copy failed for {:?}: {}", source, copy_err);
    }
    Outcome::Fallback
}
