//! Image uniquification.
//!
//! Includes:
//! - `uniquify_image`: decode, perturb, and re-encode one image so the output
//!   is visually near-identical to the input but byte-distinct, with EXIF and
//!   other container metadata left behind.
//!
//! The perturbation chain: bake the EXIF orientation into the pixels, flatten
//! any alpha onto white, crop a random sliver off every edge and scale back to
//! the original size, jitter brightness / contrast / saturation, then finish
//! with a sub-pixel Gaussian blur.

use anyhow::{Context, Result, anyhow};
use exif::{In, Tag};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage, Rgba, RgbaImage, imageops};
use rand::Rng;
use std::fs::{self, File};
use std::io::{BufWriter, Cursor};
use std::path::Path;

use crate::constant::{
    BLUR_SIGMA_RANGE, BRIGHTNESS_RANGE, CONTRAST_RANGE, CROP_FRACTION_RANGE, JPEG_QUALITY,
    SATURATION_RANGE,
};
use crate::utils::PathExt;

/// Rewrite the image at `source` into a perturbed copy at `dest`. The output
/// keeps the source's pixel dimensions and container format.
pub fn uniquify_image(source: &Path, dest: &Path) -> Result<()> {
    let format = ImageFormat::from_extension(source.ext_lower())
        .ok_or_else(|| anyhow!("unsupported image extension on {:?}", source))?;
    let raw = fs::read(source).with_context(|| format!("failed to read image {:?}", source))?;
    let mut img = image::load_from_memory(&raw)
        .with_context(|| format!("failed to decode image {:?}", source))?;
    bake_orientation(&raw, &mut img);
    let img = flatten_alpha(img);

    let (width, height) = img.dimensions();
    let mut rng = rand::rng();

    // crop a sliver off every edge, then restore the original size
    let crop_fraction = rng.random_range(CROP_FRACTION_RANGE);
    let trim_x = (width as f32 * crop_fraction).round() as u32;
    let trim_y = (height as f32 * crop_fraction).round() as u32;
    let kept_width = width.saturating_sub(2 * trim_x).max(1);
    let kept_height = height.saturating_sub(2 * trim_y).max(1);
    let img = img
        .crop_imm(trim_x, trim_y, kept_width, kept_height)
        .resize_exact(width, height, FilterType::Lanczos3);

    let mut rgb = img.to_rgb8();
    jitter_colors(
        &mut rgb,
        rng.random_range(BRIGHTNESS_RANGE),
        rng.random_range(CONTRAST_RANGE),
        rng.random_range(SATURATION_RANGE),
    );
    let softened = DynamicImage::ImageRgb8(rgb).blur(rng.random_range(BLUR_SIGMA_RANGE));

    encode_image(&softened, dest, format)
}

/// Rotate the pixel data to match the EXIF orientation tag, if one is
/// present. Images without readable EXIF are left untouched.
fn bake_orientation(raw: &[u8], img: &mut DynamicImage) {
    let Ok(exif) = exif::Reader::new().read_from_container(&mut Cursor::new(raw)) else {
        return;
    };
    if let Some(orientation) = exif.get_field(Tag::Orientation, In::PRIMARY) {
        match orientation.display_value().to_string().as_str() {
            "row 0 at right and column 0 at top" => *img = img.rotate90(),
            "row 0 at bottom and column 0 at right" => *img = img.rotate180(),
            "row 0 at left and column 0 at bottom" => *img = img.rotate270(),
            _ => {}
        }
    }
}

/// Composite transparent images onto a white background; fully opaque inputs
/// pass through unchanged.
fn flatten_alpha(img: DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return img;
    }
    let (width, height) = img.dimensions();
    let mut background = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut background, &img.to_rgba8(), 0, 0);
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(background).to_rgb8())
}

/// One pass over the pixels: multiply by `brightness`, scale the distance
/// from mid-grey by `contrast`, then blend each channel toward its Rec.601
/// luma by `saturation`.
fn jitter_colors(img: &mut RgbImage, brightness: f32, contrast: f32, saturation: f32) {
    for pixel in img.pixels_mut() {
        let [r, g, b] = pixel.0;
        let mut r = r as f32 * brightness;
        let mut g = g as f32 * brightness;
        let mut b = b as f32 * brightness;

        r = (r - 127.5) * contrast + 127.5;
        g = (g - 127.5) * contrast + 127.5;
        b = (b - 127.5) * contrast + 127.5;

        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        r = luma + (r - luma) * saturation;
        g = luma + (g - luma) * saturation;
        b = luma + (b - luma) * saturation;

        pixel.0 = [clamp_channel(r), clamp_channel(g), clamp_channel(b)];
    }
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Encode with the source's container format. JPEG is written at a fixed
/// high quality, PNG with its strongest compression, WebP losslessly.
fn encode_image(img: &DynamicImage, dest: &Path, format: ImageFormat) -> Result<()> {
    match format {
        ImageFormat::Jpeg => {
            let writer = BufWriter::new(
                File::create(dest).with_context(|| format!("failed to create {:?}", dest))?,
            );
            img.write_with_encoder(JpegEncoder::new_with_quality(writer, JPEG_QUALITY))
                .with_context(|| format!("failed to encode jpeg {:?}", dest))?;
        }
        ImageFormat::Png => {
            let writer = BufWriter::new(
                File::create(dest).with_context(|| format!("failed to create {:?}", dest))?,
            );
            img.write_with_encoder(PngEncoder::new_with_quality(
                writer,
                CompressionType::Best,
                PngFilter::Adaptive,
            ))
            .with_context(|| format!("failed to encode png {:?}", dest))?;
        }
        ImageFormat::WebP => {
            let writer = BufWriter::new(
                File::create(dest).with_context(|| format!("failed to create {:?}", dest))?,
            );
            img.write_with_encoder(WebPEncoder::new_lossless(writer))
                .with_context(|| format!("failed to encode webp {:?}", dest))?;
        }
        _ => {
            img.save_with_format(dest, format)
                .with_context(|| format!("failed to save image {:?}", dest))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x + y) % 256) as u8,
            ])
        }))
    }

    /// JPEG bytes with an APP1 EXIF segment (Orientation = 6, "rotate 90 cw")
    /// spliced in right after the SOI marker.
    fn jpeg_with_orientation_six(img: &DynamicImage) -> Vec<u8> {
        let mut plain = Cursor::new(Vec::new());
        img.write_to(&mut plain, ImageFormat::Jpeg).unwrap();
        let plain = plain.into_inner();

        // little-endian TIFF block holding a single Orientation entry
        let tiff: [u8; 26] = [
            0x49, 0x49, 0x2a, 0x00, 0x08, 0x00, 0x00, 0x00, // "II", 42, IFD0 at offset 8
            0x01, 0x00, // one entry
            0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, // tag 0x0112, SHORT, count 1
            0x06, 0x00, 0x00, 0x00, // value 6
            0x00, 0x00, 0x00, 0x00, // no next IFD
        ];
        let mut tagged = Vec::with_capacity(plain.len() + 36);
        tagged.extend_from_slice(&plain[..2]);
        tagged.extend_from_slice(&[0xff, 0xe1, 0x00, 0x22]);
        tagged.extend_from_slice(b"Exif\0\0");
        tagged.extend_from_slice(&tiff);
        tagged.extend_from_slice(&plain[2..]);
        tagged
    }

    #[test]
    fn output_keeps_the_source_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        let dest = dir.path().join("out.png");
        gradient_image(120, 80).save(&source).unwrap();

        uniquify_image(&source, &dest).unwrap();

        let reloaded = image::open(&dest).unwrap();
        assert_eq!(reloaded.dimensions(), (120, 80));
    }

    #[test]
    fn two_runs_produce_different_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        gradient_image(64, 64).save(&source).unwrap();

        let first = dir.path().join("a.png");
        let second = dir.path().join("b.png");
        uniquify_image(&source, &first).unwrap();
        uniquify_image(&source, &second).unwrap();

        let original = fs::read(&source).unwrap();
        let first = fs::read(&first).unwrap();
        let second = fs::read(&second).unwrap();
        assert_ne!(first, original);
        assert_ne!(first, second);
    }

    #[test]
    fn transparency_is_flattened_onto_white() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));

        let flattened = flatten_alpha(DynamicImage::ImageRgba8(img));
        let rgb = flattened.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 1).0, [255, 0, 0]);
    }

    #[test]
    fn identity_jitter_leaves_pixels_alone() {
        let mut img = RgbImage::from_fn(8, 8, |x, y| Rgb([x as u8 * 30, y as u8 * 30, 200]));
        let reference = img.clone();
        jitter_colors(&mut img, 1.0, 1.0, 1.0);
        assert_eq!(img, reference);
    }

    #[test]
    fn extreme_jitter_stays_within_channel_range() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([250, 250, 250]));
        jitter_colors(&mut img, 1.04, 1.04, 1.05);
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn orientation_tag_is_baked_in_and_no_exif_survives() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tagged.jpg");
        let dest = dir.path().join("out.jpg");
        let tagged = jpeg_with_orientation_six(&gradient_image(120, 80));
        fs::write(&source, &tagged).unwrap();

        // the fixture really carries the tag
        let parsed = exif::Reader::new()
            .read_from_container(&mut Cursor::new(&tagged))
            .unwrap();
        assert!(parsed.get_field(Tag::Orientation, In::PRIMARY).is_some());

        uniquify_image(&source, &dest).unwrap();

        // the rotation moved into the pixels, so the sides swap
        let reloaded = image::open(&dest).unwrap();
        assert_eq!(reloaded.dimensions(), (80, 120));

        // and nothing EXIF-shaped is left to read back
        let rewritten = fs::read(&dest).unwrap();
        assert!(
            exif::Reader::new()
                .read_from_container(&mut Cursor::new(&rewritten))
                .is_err()
        );
    }

    #[test]
    fn jpeg_webp_and_bmp_outputs_stay_decodable_at_size() {
        let dir = tempfile::tempdir().unwrap();
        for ext in ["jpg", "webp", "bmp"] {
            let source = dir.path().join(format!("photo.{ext}"));
            let dest = dir.path().join(format!("out.{ext}"));
            gradient_image(90, 60).save(&source).unwrap();

            uniquify_image(&source, &dest).unwrap();

            let reloaded = image::open(&dest).unwrap();
            assert_eq!(reloaded.dimensions(), (90, 60), "{ext}");
        }
    }

    #[test]
    fn undecodable_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.png");
        fs::write(&source, b"not an image at all").unwrap();
        assert!(uniquify_image(&source, &dir.path().join("out.png")).is_err());
    }
}
