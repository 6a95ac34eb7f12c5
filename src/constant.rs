//! Shared constants. Extension sets and junk-entry names live here, as do
//! the bounds of every random perturbation.

use std::ops::RangeInclusive;

/// Extensions routed to the image transform (compared case-insensitively).
pub const VALID_IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "bmp"];

/// Extensions routed to the video transform (compared case-insensitively).
pub const VALID_VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "mkv"];

/// macOS resource-fork folder; the whole subtree is pruned while walking.
pub const RESOURCE_FORK_DIR: &str = "__MACOSX";

/// AppleDouble sidecar prefix; files carrying it are dropped.
pub const APPLE_DOUBLE_PREFIX: &str = "._";

/// Finder metadata file; dropped wherever it appears.
pub const FINDER_METADATA_FILE: &str = ".DS_Store";

// ─────────────────────────────────────────────────────────────────────────────
// Image perturbation bounds. Every draw is uniform over the inclusive range.
// ─────────────────────────────────────────────────────────────────────────────

/// Fraction trimmed off each edge before scaling back to the original size.
pub const CROP_FRACTION_RANGE: RangeInclusive<f32> = 0.01..=0.02;

/// Multiplier applied to every channel.
pub const BRIGHTNESS_RANGE: RangeInclusive<f32> = 0.96..=1.04;

/// Scaling of the distance from mid-grey.
pub const CONTRAST_RANGE: RangeInclusive<f32> = 0.96..=1.04;

/// Blend factor between each pixel and its luma.
pub const SATURATION_RANGE: RangeInclusive<f32> = 0.95..=1.05;

/// Gaussian sigma of the final sub-pixel blur.
pub const BLUR_SIGMA_RANGE: RangeInclusive<f32> = 0.05..=0.12;

/// Quality for re-encoded JPEGs.
pub const JPEG_QUALITY: u8 = 95;

// ─────────────────────────────────────────────────────────────────────────────
// Video filter bounds. Values are rounded to two decimals before they are
// written into the ffmpeg filter graph.
// ─────────────────────────────────────────────────────────────────────────────

/// Bounds shared by the eq filter's contrast, saturation, and gamma knobs.
pub const VIDEO_EQ_RANGE: RangeInclusive<f32> = 0.96..=1.04;

/// Audio volume multiplier.
pub const VOLUME_RANGE: RangeInclusive<f32> = 0.95..=1.05;

/// Fraction of the frame kept by the spatial crop.
pub const VIDEO_CROP_RANGE: RangeInclusive<f32> = 0.98..=0.99;

/// Length drawn for the random filename token used by the rename policy.
pub const SUFFIX_LEN_RANGE: RangeInclusive<usize> = 3..=6;
