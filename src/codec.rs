//! Payload compression.
//!
//! Every algorithm is a [`PayloadCodec`]; the container stores the
//! algorithm id so the reader picks the matching decompressor.
//!
//! | Id | Name      | Codec                                              |
//! |----|-----------|----------------------------------------------------|
//! | 0  | `none`    | bytes stored as-is                                 |
//! | 1  | `zlib`    | deflate in a zlib wrapper (default)                |
//! | 2  | `huffman` | packed codebook + bit-packed Huffman stream        |
//!
//! [`compress_payload`] never returns bytes it has not decompressed and
//! compared against the input first.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bitpack;
use crate::codebook::CodeBook;
use crate::huffman::HuffmanTree;
use crate::{PzError, PzResult};

/// Compression algorithm selector, stored as `algorithm_id` in containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum Algorithm {
    None = 0,
    #[default]
    Zlib = 1,
    Huffman = 2,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::None, Algorithm::Zlib, Algorithm::Huffman];

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::None => "none",
            Algorithm::Zlib => "zlib",
            Algorithm::Huffman => "huffman",
        }
    }
}

impl TryFrom<u32> for Algorithm {
    type Error = PzError;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Algorithm::None),
            1 => Ok(Algorithm::Zlib),
            2 => Ok(Algorithm::Huffman),
            _ => Err(PzError::Unsupported(format!("algorithm id {v}"))),
        }
    }
}

impl FromStr for Algorithm {
    type Err = PzError;

    /// Also accepts the names older envelopes used (`deflate`, `stored`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "stored" | "raw" => Ok(Algorithm::None),
            "zlib" | "deflate" | "flate" => Ok(Algorithm::Zlib),
            "huffman" | "huff" => Ok(Algorithm::Huffman),
            other => Err(PzError::Unsupported(format!("algorithm '{other}'"))),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lossless byte compressor.
pub trait PayloadCodec {
    fn algorithm(&self) -> Algorithm;
    fn compress(&self, input: &[u8]) -> PzResult<Vec<u8>>;
    fn decompress(&self, input: &[u8]) -> PzResult<Vec<u8>>;
}

/// Bytes pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stored;

impl PayloadCodec for Stored {
    fn algorithm(&self) -> Algorithm {
        Algorithm::None
    }

    fn compress(&self, input: &[u8]) -> PzResult<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn decompress(&self, input: &[u8]) -> PzResult<Vec<u8>> {
        Ok(input.to_vec())
    }
}

/// Compression level handed to the deflate encoder.
const ZLIB_LEVEL: u8 = 6;

/// Deflate with zlib framing (header + Adler-32 trailer).
#[derive(Debug, Clone, Copy, Default)]
pub struct Zlib;

impl PayloadCodec for Zlib {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Zlib
    }

    fn compress(&self, input: &[u8]) -> PzResult<Vec<u8>> {
        Ok(miniz_oxide::deflate::compress_to_vec_zlib(input, ZLIB_LEVEL))
    }

    fn decompress(&self, input: &[u8]) -> PzResult<Vec<u8>> {
        fdeflate::decompress_to_vec(input)
            .map_err(|e| PzError::InvalidInput(format!("zlib stream: {e:?}")))
    }
}

/// Native Huffman coding.
///
/// Stream layout:
/// - Original length: u32 LE
/// - Packed codebook length: u32 LE
/// - Packed codebook
/// - Padding bits in the last byte: u8
/// - Bit-packed codes
#[derive(Debug, Clone, Copy, Default)]
pub struct Huffman;

const HUFFMAN_HEADER_SIZE: usize = 8;

impl PayloadCodec for Huffman {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Huffman
    }

    fn compress(&self, input: &[u8]) -> PzResult<Vec<u8>> {
        let orig_len = u32::try_from(input.len())
            .map_err(|_| PzError::Unsupported("huffman input over 4 GiB".into()))?;
        let tree = HuffmanTree::from_data(input);
        let book = CodeBook::generate(tree.as_ref());
        let packed_book = book.pack()?;
        let (data, padding) = bitpack::pack(&book.encode(input)?);

        let mut out = Vec::with_capacity(HUFFMAN_HEADER_SIZE + packed_book.len() + 1 + data.len());
        out.extend_from_slice(&orig_len.to_le_bytes());
        out.extend_from_slice(&(packed_book.len() as u32).to_le_bytes());
        out.extend_from_slice(&packed_book);
        out.push(padding);
        out.extend_from_slice(&data);
        Ok(out)
    }

    fn decompress(&self, input: &[u8]) -> PzResult<Vec<u8>> {
        if input.len() < HUFFMAN_HEADER_SIZE + 1 {
            return Err(PzError::InvalidInput("truncated huffman header".into()));
        }
        let orig_len = u32::from_le_bytes([input[0], input[1], input[2], input[3]]) as usize;
        let book_len = u32::from_le_bytes([input[4], input[5], input[6], input[7]]) as usize;
        let rest = &input[HUFFMAN_HEADER_SIZE..];
        if rest.len() < book_len + 1 {
            return Err(PzError::InvalidInput("truncated huffman codebook".into()));
        }
        let book = CodeBook::unpack(&rest[..book_len])?;
        let padding = rest[book_len];
        let bits = bitpack::unpack(&rest[book_len + 1..], padding)?;
        book.decode(&bits, orig_len)
    }
}

/// The codec registered for `algorithm`.
pub fn codec_for(algorithm: Algorithm) -> &'static dyn PayloadCodec {
    match algorithm {
        Algorithm::None => &Stored,
        Algorithm::Zlib => &Zlib,
        Algorithm::Huffman => &Huffman,
    }
}

/// Compress with `algorithm`, verifying the round trip before returning.
pub fn compress_payload(input: &[u8], algorithm: Algorithm) -> PzResult<Vec<u8>> {
    compress_verified(codec_for(algorithm), input)
}

/// Compress with any codec, verifying the round trip before returning.
///
/// A decompression error or any difference from `input` fails with
/// [`PzError::CompressionIntegrity`].
pub fn compress_verified(codec: &dyn PayloadCodec, input: &[u8]) -> PzResult<Vec<u8>> {
    if input.is_empty() {
        return Err(PzError::EmptyInput);
    }
    let compressed = codec.compress(input)?;
    match codec.decompress(&compressed) {
        Ok(restored) if restored == input => {
            log::debug!(
                "{}: {} -> {} bytes",
                codec.algorithm(),
                input.len(),
                compressed.len()
            );
            Ok(compressed)
        }
        Ok(_) => {
            log::error!("{}: round trip produced different bytes", codec.algorithm());
            Err(PzError::CompressionIntegrity(codec.algorithm()))
        }
        Err(e) => {
            log::error!("{}: round trip failed to decode: {e}", codec.algorithm());
            Err(PzError::CompressionIntegrity(codec.algorithm()))
        }
    }
}

/// Decompress a payload written with `algorithm`.
pub fn decompress_payload(input: &[u8], algorithm: Algorithm) -> PzResult<Vec<u8>> {
    codec_for(algorithm).decompress(input)
}
