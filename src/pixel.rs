//! Pixel buffer transforms.
//!
//! Buffers are raw, row-major, 8 bits per channel: one byte per pixel for
//! grayscale, one RGB triple per pixel for color. The layout of a buffer
//! is never stored separately; it is recovered from its length and the
//! image dimensions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{PzError, PzResult};

/// Channel layout of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLayout {
    Gray,
    Rgb,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Gray => 1,
            PixelLayout::Rgb => 3,
        }
    }

    /// Single-byte tag used by the earliest binary envelope.
    pub fn to_tag(self) -> u8 {
        match self {
            PixelLayout::Gray => 0,
            PixelLayout::Rgb => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(PixelLayout::Gray),
            1 => Some(PixelLayout::Rgb),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelLayout::Gray => "gray",
            PixelLayout::Rgb => "rgb",
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelLayout {
    type Err = PzError;

    /// Accepts the spellings older envelopes wrote: `gray`, `grey`,
    /// `grayscale`, `l` and `rgb`, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gray" | "grey" | "grayscale" | "greyscale" | "l" => Ok(PixelLayout::Gray),
            "rgb" | "color" | "colour" => Ok(PixelLayout::Rgb),
            other => Err(PzError::InvalidMetadata(format!(
                "unknown pixel type '{other}'"
            ))),
        }
    }
}

/// A decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub pixels: Vec<u8>,
}

impl Image {
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Pixels as RGB triples, replicating gray values into all channels.
    pub fn to_rgb(&self) -> Vec<u8> {
        match self.layout {
            PixelLayout::Rgb => self.pixels.clone(),
            PixelLayout::Gray => self.pixels.iter().flat_map(|&v| [v, v, v]).collect(),
        }
    }
}

/// Reject zero dimensions.
pub fn validate_dimensions(width: u32, height: u32) -> PzResult<()> {
    if width == 0 || height == 0 {
        return Err(PzError::InvalidMetadata(format!(
            "dimensions must be positive, got {width}x{height}"
        )));
    }
    Ok(())
}

/// Layout implied by a buffer length, if any.
pub fn layout_for_len(len: usize, width: u32, height: u32) -> Option<PixelLayout> {
    let pixels = width as u64 * height as u64;
    match len as u64 {
        n if n == pixels => Some(PixelLayout::Gray),
        n if n == pixels * 3 => Some(PixelLayout::Rgb),
        _ => None,
    }
}

/// Luminance of each RGB triple: `floor(0.299 R + 0.587 G + 0.114 B)`.
pub fn to_grayscale(rgb: &[u8]) -> PzResult<Vec<u8>> {
    if rgb.len() % 3 != 0 {
        return Err(PzError::InvalidMetadata(format!(
            "RGB buffer length {} is not a multiple of 3",
            rgb.len()
        )));
    }
    Ok(rgb
        .chunks_exact(3)
        .map(|p| {
            let l = 299 * p[0] as u32 + 587 * p[1] as u32 + 114 * p[2] as u32;
            (l / 1000) as u8
        })
        .collect())
}

/// Interpret decompressed bytes as an image of the given dimensions.
pub fn reconstruct(bytes: Vec<u8>, width: u32, height: u32) -> PzResult<Image> {
    validate_dimensions(width, height)?;
    let layout = layout_for_len(bytes.len(), width, height).ok_or(
        PzError::PixelFormatMismatch {
            len: bytes.len(),
            width,
            height,
        },
    )?;
    Ok(Image {
        width,
        height,
        layout,
        pixels: bytes,
    })
}

/// Target dimensions no larger than `max_pixels` with the same aspect ratio.
pub fn fit_within(width: u32, height: u32, max_pixels: u64) -> (u32, u32) {
    let total = width as u64 * height as u64;
    if total <= max_pixels || max_pixels == 0 {
        return (width, height);
    }
    let scale = (max_pixels as f64 / total as f64).sqrt();
    let mut w = ((width as f64 * scale).floor() as u32).clamp(1, width);
    let mut h = ((height as f64 * scale).floor() as u32).clamp(1, height);
    // Floating point can land one step over the cap.
    while w as u64 * h as u64 > max_pixels && (w > 1 || h > 1) {
        if w >= h {
            w -= 1;
        } else {
            h -= 1;
        }
    }
    (w, h)
}

/// Nearest-neighbour resample to `new_width` x `new_height`.
pub fn resize(
    pixels: &[u8],
    layout: PixelLayout,
    width: u32,
    height: u32,
    new_width: u32,
    new_height: u32,
) -> Vec<u8> {
    let ch = layout.channels();
    let mut out = Vec::with_capacity(new_width as usize * new_height as usize * ch);
    for y in 0..new_height as u64 {
        let sy = (y * height as u64 / new_height as u64) as usize;
        for x in 0..new_width as u64 {
            let sx = (x * width as u64 / new_width as u64) as usize;
            let at = (sy * width as usize + sx) * ch;
            out.extend_from_slice(&pixels[at..at + ch]);
        }
    }
    out
}

/// Shrink an image so that it has at most `max_pixels` pixels.
///
/// Returns the (possibly unchanged) buffer and its dimensions.
pub fn downsample(
    pixels: &[u8],
    layout: PixelLayout,
    width: u32,
    height: u32,
    max_pixels: u64,
) -> (Vec<u8>, u32, u32) {
    let (w, h) = fit_within(width, height, max_pixels);
    if (w, h) == (width, height) {
        return (pixels.to_vec(), width, height);
    }
    log::warn!("downsampling {width}x{height} to {w}x{h} (cap {max_pixels} pixels)");
    (resize(pixels, layout, width, height, w, h), w, h)
}
