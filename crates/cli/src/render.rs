//! Output encoding
//!
//! Turns solver fields into 8-bit images. The colour interpretation of a field's
//! channels is chosen by [`ColorMapping`] at this boundary; the core never deals in
//! display colours.

use anyhow::{ensure, Context, Result};
use hornschunck_core::solver::FLOW_CHANNELS;
use hornschunck_core::{FloatBuffer, Rect};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

/// Scale applied to flow components before offsetting them into chroma
const DIRECTION_SCALE: f32 = 100.0;
/// Chroma value representing zero flow
const CHROMA_ZERO: f32 = 127.5;

/// Colour interpretation of a field's channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMapping {
    /// One channel rendered as 8-bit gray
    Grayscale,
    /// Three channels `(Y, Cb, Cr)` converted to RGB
    YCbCrDirection,
    /// Three or four channels copied as RGBA; a missing alpha becomes 0
    RgbaPassthrough,
}

impl ColorMapping {
    /// Channels per cell this mapping can render
    pub fn accepts(self, channels: usize) -> bool {
        match self {
            Self::Grayscale => channels == 1,
            Self::YCbCrDirection => channels == 3,
            Self::RgbaPassthrough => channels == 3 || channels == 4,
        }
    }

    /// Render every cell of `field` into an image of the same size
    ///
    /// The field's min corner becomes pixel `(0, 0)`.
    ///
    /// # Errors
    ///
    /// Fails if the field's channel count does not suit this mapping.
    pub fn render<S: AsRef<[f32]>>(self, field: &FloatBuffer<S>) -> Result<DynamicImage> {
        ensure!(
            self.accepts(field.channels()),
            "{self:?} cannot render a {}-channel field",
            field.channels()
        );
        let (width, height) = image_size(field.bounds())?;
        let cells: Vec<&[f32]> = field.cells().collect();
        let cell = |x: u32, y: u32| cells[(y * width + x) as usize];

        let image = match self {
            Self::Grayscale => DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
                Luma([saturate_u8(cell(x, y)[0])])
            })),
            Self::YCbCrDirection => DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                let c = cell(x, y);
                Rgb(ycbcr_to_rgb(saturate_u8(c[0]), saturate_u8(c[1]), saturate_u8(c[2])))
            })),
            Self::RgbaPassthrough => {
                DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
                    let c = cell(x, y);
                    let alpha = c.get(3).copied().map_or(0, saturate_u8);
                    Rgba([saturate_u8(c[0]), saturate_u8(c[1]), saturate_u8(c[2]), alpha])
                }))
            }
        };
        Ok(image)
    }
}

/// Convert to `u8`: negative and NaN values become 0, values above 255 become 255,
/// everything else is truncated towards zero
pub fn saturate_u8(value: f32) -> u8 {
    // Float-to-int `as` saturates and maps NaN to 0
    value as u8
}

/// JFIF (full-range BT.601) YCbCr to RGB
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = f32::from(y);
    let cb = f32::from(cb) - 128.0;
    let cr = f32::from(cr) - 128.0;
    [
        saturate_u8((y + 1.402 * cr).round()),
        saturate_u8((y - 0.344_136 * cb - 0.714_136 * cr).round()),
        saturate_u8((y + 1.772 * cb).round()),
    ]
}

/// `(Y, Cb, Cr)` direction field from a rescaled magnitude and a flow field
///
/// Luma is the magnitude at the same cell; the chroma channels encode `u` and `v`
/// as `component * 100 + 127.5`, so zero flow renders as neutral gray.
///
/// # Errors
///
/// Fails if the fields differ in bounds or have the wrong channel counts.
pub fn direction_field<A, B>(magnitude: &FloatBuffer<A>, flow: &FloatBuffer<B>) -> Result<FloatBuffer>
where
    A: AsRef<[f32]>,
    B: AsRef<[f32]>,
{
    ensure!(
        magnitude.bounds() == flow.bounds(),
        "magnitude bounds {} differ from flow bounds {}",
        magnitude.bounds(),
        flow.bounds()
    );
    ensure!(magnitude.channels() == 1, "magnitude must have one channel");
    ensure!(
        flow.channels() == FLOW_CHANNELS,
        "flow must have {FLOW_CHANNELS} channels"
    );

    let data = magnitude
        .cells()
        .zip(flow.cells())
        .flat_map(|(m, uv)| {
            [
                m[0],
                uv[0] * DIRECTION_SCALE + CHROMA_ZERO,
                uv[1] * DIRECTION_SCALE + CHROMA_ZERO,
            ]
        })
        .collect();
    Ok(FloatBuffer::from_vec(flow.bounds(), 3, data)?)
}

fn image_size(bounds: Rect) -> Result<(u32, u32)> {
    let width = u32::try_from(bounds.width()).context("field width out of range")?;
    let height = u32::try_from(bounds.height()).context("field height out of range")?;
    Ok((width, height))
}
