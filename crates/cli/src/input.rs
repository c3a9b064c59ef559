//! Frame loading
//!
//! Decodes an image file, maps it to 8-bit luminance and places it in a
//! single-channel buffer whose bounds extend one cell past the image on every
//! side. The extra ring is filled by mirroring, ready for the derivative stencil.

use anyhow::{bail, Context, Result};
use hornschunck_core::{FloatBuffer, Rect};
use image::{DynamicImage, GrayImage};
use std::path::Path;
use tracing::debug;

/// Rec.601 luma of an 8-bit RGB triple, rounded to the nearest integer
pub fn rec601_luma([r, g, b]: [u8; 3]) -> u8 {
    let weighted = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    // Weights sum to 1000, so the result never exceeds 255
    ((weighted + 500) / 1000) as u8
}

/// Luminance plane of a decoded image
///
/// 8-bit gray images pass through unchanged; everything else goes through
/// 8-bit RGB and [`rec601_luma`].
pub fn luminance(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => {
            let rgb = other.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                image::Luma([rec601_luma(rgb.get_pixel(x, y).0)])
            })
        }
    }
}

/// Bordered single-channel frame from a luminance plane
///
/// The image occupies `(0, 0)..(width, height)`; the buffer bounds are that
/// rectangle grown by one cell, with the mirror border applied.
///
/// # Errors
///
/// Fails if the image dimensions do not fit the buffer's coordinate range.
pub fn bordered_frame(gray: &GrayImage) -> Result<FloatBuffer> {
    let width = i32::try_from(gray.width()).context("image width out of range")?;
    let height = i32::try_from(gray.height()).context("image height out of range")?;
    let bounds = Rect::from_size(width, height);

    let mut frame = FloatBuffer::new(bounds.outset(1), 1)?;
    for (x, y, pixel) in gray.enumerate_pixels() {
        frame.set(x as i32, y as i32, 0, f32::from(pixel.0[0]))?;
    }
    frame.apply_mirror_border();
    Ok(frame)
}

/// Load one frame from `path`
///
/// # Errors
///
/// Fails if the file cannot be opened or decoded.
pub fn load_frame(path: &Path) -> Result<FloatBuffer> {
    let image = image::open(path).with_context(|| format!("failed to load {}", path.display()))?;
    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "Decoded frame"
    );
    bordered_frame(&luminance(&image))
}

/// Load both frames of a flow computation
///
/// # Errors
///
/// Fails if either frame cannot be loaded or the two differ in size.
pub fn load_frame_pair(first: &Path, second: &Path) -> Result<(FloatBuffer, FloatBuffer)> {
    let f1 = load_frame(first)?;
    let f2 = load_frame(second)?;
    if f1.bounds() != f2.bounds() {
        bail!(
            "{} and {} differ in size ({} vs {})",
            first.display(),
            second.display(),
            f1.bounds().inset(1),
            f2.bounds().inset(1)
        );
    }
    Ok((f1, f2))
}
