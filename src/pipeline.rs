//! Image compression pipeline.
//!
//! Ties the stages together: pixel validation and reduction, payload
//! compression with round-trip verification, statistics, and the
//! container envelope.
//!
//! **Compress:** validate → downsample (optional) → grayscale (optional)
//! → [`compress_payload`] → [`Stats::collect`]
//!
//! **Decompress:** [`container::read`] → [`decompress_payload`] →
//! [`pixel::reconstruct`]

use serde::{Deserialize, Serialize};

use crate::codec::{compress_payload, decompress_payload, Algorithm};
use crate::container::{self, Metadata, OutputFormat};
use crate::pixel::{self, Image, PixelLayout};
use crate::stats::{Stats, DEFAULT_STATS_THRESHOLD};
use crate::{PzError, PzResult};

/// Whether color survives compression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Keep the input layout.
    #[default]
    Preserve,
    /// Reduce RGB input to one luminance channel.
    Gray,
}

/// Options controlling image compression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressOptions {
    /// Payload codec.
    pub algorithm: Algorithm,
    pub color: ColorMode,
    /// Downsample images with more pixels than this, keeping the aspect
    /// ratio. `None` keeps the full resolution; `Some(0)` is rejected.
    pub max_pixels: Option<u64>,
    /// Inputs above this many bytes skip the Huffman statistics.
    pub stats_threshold: usize,
    /// Envelope used by [`encode_image`].
    pub format: OutputFormat,
}

impl Default for CompressOptions {
    fn default() -> Self {
        CompressOptions {
            algorithm: Algorithm::default(),
            color: ColorMode::default(),
            max_pixels: None,
            stats_threshold: DEFAULT_STATS_THRESHOLD,
            format: OutputFormat::default(),
        }
    }
}

/// A compressed image, before it is wrapped in a container.
#[derive(Debug, Clone)]
pub struct Compressed {
    pub metadata: Metadata,
    pub payload: Vec<u8>,
    pub stats: Stats,
}

impl Compressed {
    /// Serialize into a container of the given format.
    pub fn to_container(&self, format: OutputFormat) -> PzResult<Vec<u8>> {
        container::write(&self.payload, &self.metadata, format)
    }
}

/// Compress raw gray or RGB pixels.
///
/// The layout is inferred from the buffer length. Fails with
/// [`PzError::EmptyInput`] for an empty buffer and
/// [`PzError::InvalidMetadata`] when the dimensions or length don't fit.
pub fn compress(
    pixels: &[u8],
    width: u32,
    height: u32,
    options: &CompressOptions,
) -> PzResult<Compressed> {
    if pixels.is_empty() {
        return Err(PzError::EmptyInput);
    }
    pixel::validate_dimensions(width, height)?;
    let layout = pixel::layout_for_len(pixels.len(), width, height).ok_or_else(|| {
        PzError::InvalidMetadata(format!(
            "{} bytes is neither grayscale nor RGB for {width}x{height}",
            pixels.len()
        ))
    })?;

    let (mut buffer, width, height) = match options.max_pixels {
        Some(0) => {
            return Err(PzError::InvalidMetadata(
                "max_pixels must be at least 1".into(),
            ))
        }
        Some(cap) => pixel::downsample(pixels, layout, width, height, cap),
        None => (pixels.to_vec(), width, height),
    };
    let layout = match (options.color, layout) {
        (ColorMode::Gray, PixelLayout::Rgb) => {
            buffer = pixel::to_grayscale(&buffer)?;
            PixelLayout::Gray
        }
        (_, layout) => layout,
    };

    let payload = compress_payload(&buffer, options.algorithm)?;
    let pixel_count = width as u64 * height as u64;
    let stats = Stats::collect(
        &buffer,
        payload.len(),
        pixel_count,
        options.stats_threshold,
    );
    log::debug!(
        "compressed {width}x{height} {layout}: {} -> {} bytes ({})",
        buffer.len(),
        payload.len(),
        options.algorithm
    );

    Ok(Compressed {
        metadata: Metadata::new(width, height, options.algorithm).with_layout(layout),
        payload,
        stats,
    })
}

/// Decompress a payload and rebuild the image.
pub fn decompress(
    payload: &[u8],
    width: u32,
    height: u32,
    algorithm: Algorithm,
) -> PzResult<Image> {
    let bytes = decompress_payload(payload, algorithm)?;
    pixel::reconstruct(bytes, width, height)
}

/// Compress pixels and wrap them in a container.
pub fn encode_image(
    pixels: &[u8],
    width: u32,
    height: u32,
    options: &CompressOptions,
) -> PzResult<(Vec<u8>, Stats)> {
    let compressed = compress(pixels, width, height, options)?;
    let blob = compressed.to_container(options.format)?;
    Ok((blob, compressed.stats))
}

/// Read a container of any generation and decompress it.
pub fn decode_image(blob: &[u8]) -> PzResult<Image> {
    let container = container::read(blob)?;
    let meta = container.metadata;
    let image = decompress(&container.payload, meta.width, meta.height, meta.algorithm)?;
    if let Some(recorded) = meta.layout {
        if recorded != image.layout {
            return Err(PzError::InvalidMetadata(format!(
                "container says {recorded} but payload decodes as {}",
                image.layout
            )));
        }
    }
    Ok(image)
}
