pub mod bitpack;
pub mod codebook;
pub mod codec;
pub mod container;
pub mod crc32;
pub mod frequency;
pub mod huffman;
pub mod pipeline;
pub mod pixel;
pub mod pqueue;
pub mod stats;

#[cfg(test)]
mod validation;

use std::path::PathBuf;

pub use codec::Algorithm;
pub use container::{Container, Generation, Metadata, OutputFormat};
pub use pipeline::{decode_image, encode_image, ColorMode, CompressOptions, Compressed};
pub use pixel::{Image, PixelLayout};
pub use stats::Stats;

/// Error types for pzimg operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PzError {
    /// Payload or pixel buffer is empty where content is required.
    #[error("empty input")]
    EmptyInput,
    /// Dimensions are non-positive or disagree with the buffer.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
    /// The immediate compress/decompress check did not reproduce the input.
    #[error("{0} round-trip verification failed")]
    CompressionIntegrity(Algorithm),
    /// A written file did not read back byte-identical.
    #[error("write verification failed for {}", .0.display())]
    IntegrityError(PathBuf),
    /// Payload CRC-32 does not match the header.
    #[error("corruption detected: checksum {actual:#010x}, header says {expected:#010x}")]
    CorruptionDetected { expected: u32, actual: u32 },
    /// Header length field disagrees with the bytes present.
    #[error("length mismatch: header declares {declared} payload bytes, found {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    /// No known container generation matches.
    #[error("unrecognized container format")]
    UnrecognizedFormat,
    /// The blob is an output-only rendering that cannot be decoded back.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(&'static str),
    /// Decompressed length matches neither grayscale nor RGB.
    #[error("{len} bytes is neither grayscale nor RGB for {width}x{height}")]
    PixelFormatMismatch { len: usize, width: u32, height: u32 },
    /// Bitstream, codebook, tree or envelope data is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Unknown algorithm id or name.
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
}

pub type PzResult<T> = Result<T, PzError>;
