//! Wallpaper image post-processing.
//!
//! Generated images come back at whatever resolution the provider felt
//! like producing. Everything that lands on disk goes through
//! [`process_wallpaper`], which normalizes the resolution and darkens
//! images that are too bright for a dark desktop theme.

use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, Rgba};

/// Mean luminance above which an image is considered too bright.
pub const DARK_LUMINANCE_THRESHOLD: f64 = 0.5;

/// Decode raw image bytes into a pixel buffer.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).context("failed to decode generated image")
}

/// Scale and crop the image so it exactly fills `width` x `height`.
pub fn resize_to_fill(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    if img.width() == width && img.height() == height {
        return img.clone();
    }

    img.resize_to_fill(width, height, FilterType::Lanczos3)
}

/// Average luminance over all pixels, in `[0.0, 1.0]`.
#[allow(clippy::cast_precision_loss)]
pub fn mean_luminance(img: &DynamicImage) -> f64 {
    let luma = img.to_luma8();
    let pixels = luma.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }

    let sum: u64 = pixels.iter().map(|&p| u64::from(p)).sum();
    sum as f64 / pixels.len() as f64 / 255.0
}

/// Darken the image when its mean luminance exceeds
/// [`DARK_LUMINANCE_THRESHOLD`]. Alpha is left untouched.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn enforce_dark_theme(img: DynamicImage) -> DynamicImage {
    let luminance = mean_luminance(&img);
    if luminance <= DARK_LUMINANCE_THRESHOLD {
        return img;
    }

    let scale = DARK_LUMINANCE_THRESHOLD / luminance;
    let mut rgba = img.into_rgba8();
    for Rgba([r, g, b, _]) in rgba.pixels_mut() {
        *r = (f64::from(*r) * scale) as u8;
        *g = (f64::from(*g) * scale) as u8;
        *b = (f64::from(*b) * scale) as u8;
    }

    DynamicImage::ImageRgba8(rgba)
}

/// Write the image to `path` as PNG.
pub fn save_png(img: &DynamicImage, path: &Path) -> Result<()> {
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write wallpaper to {}", path.display()))
}

/// Full post-processing run: decode, resize to the target resolution,
/// darken if needed and persist as PNG. Returns the final dimensions.
pub fn process_wallpaper(bytes: &[u8], width: u32, height: u32, path: &Path) -> Result<(u32, u32)> {
    let decoded = decode(bytes)?;
    let resized = resize_to_fill(&decoded, width, height);
    let darkened = enforce_dark_theme(resized);
    save_png(&darkened, path)?;

    Ok((darkened.width(), darkened.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn solid(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([value, value, value, 255]),
        ))
    }

    #[test]
    fn resize_fills_target_resolution() {
        let img = solid(400, 100, 128);

        let resized = resize_to_fill(&img, 200, 100);

        assert_eq!((resized.width(), resized.height()), (200, 100));
    }

    #[test]
    fn dark_image_is_left_alone() {
        let img = solid(4, 4, 20);

        let out = enforce_dark_theme(img);

        assert_eq!(out.to_rgba8().get_pixel(0, 0)[0], 20);
    }

    #[test]
    fn bright_image_is_darkened_below_threshold() {
        let img = solid(4, 4, 240);

        let out = enforce_dark_theme(img);

        assert!(mean_luminance(&out) <= DARK_LUMINANCE_THRESHOLD + 0.01);
    }

    #[test]
    fn process_wallpaper_writes_png_at_target_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.png");
        let mut buf = Vec::new();
        solid(64, 64, 30)
            .write_to(
                &mut std::io::Cursor::new(&mut buf),
                image::ImageFormat::Png,
            )
            .expect("encode");

        let (w, h) = process_wallpaper(&buf, 32, 16, &path).expect("process");

        assert_eq!((w, h), (32, 16));
        assert!(path.is_file());
    }
}
