//! Binary envelopes, newest to oldest.
//!
//! All integers are little-endian.
//!
//! **v2** (written today), 36-byte header:
//! `magic "KOMPRSN2"(8) | version(4) | width(4) | height(4) |
//!  data_length(4) | algorithm_id(4) | crc32(4) | reserved(4)`
//!
//! **v1**, 32-byte header: as v2 without the CRC field, magic `"KOMPRSN1"`.
//!
//! **numeric**, 12-byte header: `width(4) | height(4) | length(4)`, no
//! magic, zlib payload. Accepted only when `length` matches the bytes
//! present.
//!
//! **earliest**, 6-byte header: `width(2) | height(2) | type(1) |
//! algorithm(1)`. Last resort; accepted only with plausible fields.
use crate::codec::Algorithm;
use crate::crc32::crc32;
use crate::pixel::PixelLayout;
use crate::{PzError, PzResult};

use super::{Container, Generation, Metadata};

pub const MAGIC_V2: [u8; 8] = *b"KOMPRSN2";
pub const MAGIC_V1: [u8; 8] = *b"KOMPRSN1";

pub const VERSION_V2: u32 = 2;
pub const VERSION_V1: u32 = 1;

pub const HEADER_SIZE_V2: usize = 36;
pub const HEADER_SIZE_V1: usize = 32;
pub const HEADER_SIZE_NUMERIC: usize = 12;
pub const HEADER_SIZE_EARLIEST: usize = 6;

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

/// Check that the declared payload length matches what follows the header.
fn check_length(data: &[u8], header_size: usize, declared: u32) -> PzResult<()> {
    let actual = data.len() - header_size;
    if declared as usize != actual {
        return Err(PzError::LengthMismatch {
            declared: declared as usize,
            actual,
        });
    }
    Ok(())
}

fn checked_dimensions(width: u32, height: u32, magic: &[u8]) -> PzResult<()> {
    if width == 0 || height == 0 {
        return Err(PzError::InvalidMetadata(format!(
            "{} header has dimensions {width}x{height}",
            String::from_utf8_lossy(magic)
        )));
    }
    Ok(())
}

/// Serialize a v2 container.
pub fn write_v2(payload: &[u8], metadata: &Metadata) -> PzResult<Vec<u8>> {
    let data_length = u32::try_from(payload.len())
        .map_err(|_| PzError::Unsupported("payload over 4 GiB".into()))?;
    let mut out = Vec::with_capacity(HEADER_SIZE_V2 + payload.len());
    out.extend_from_slice(&MAGIC_V2);
    out.extend_from_slice(&VERSION_V2.to_le_bytes());
    out.extend_from_slice(&metadata.width.to_le_bytes());
    out.extend_from_slice(&metadata.height.to_le_bytes());
    out.extend_from_slice(&data_length.to_le_bytes());
    out.extend_from_slice(&metadata.algorithm.id().to_le_bytes());
    out.extend_from_slice(&crc32(payload).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Current generation: length first, then checksum.
pub fn probe_v2(data: &[u8]) -> PzResult<Option<Container>> {
    if !data.starts_with(&MAGIC_V2) {
        return Ok(None);
    }
    if data.len() < HEADER_SIZE_V2 {
        return Err(PzError::InvalidInput(format!(
            "KOMPRSN2 header needs {HEADER_SIZE_V2} bytes, got {}",
            data.len()
        )));
    }
    let version = u32_at(data, 8);
    let width = u32_at(data, 12);
    let height = u32_at(data, 16);
    let data_length = u32_at(data, 20);
    let algorithm_id = u32_at(data, 24);
    let checksum = u32_at(data, 28);

    if version != VERSION_V2 {
        log::warn!("KOMPRSN2 container declares version {version}");
    }
    check_length(data, HEADER_SIZE_V2, data_length)?;
    let payload = &data[HEADER_SIZE_V2..];
    let actual = crc32(payload);
    if actual != checksum {
        return Err(PzError::CorruptionDetected {
            expected: checksum,
            actual,
        });
    }
    checked_dimensions(width, height, &MAGIC_V2)?;

    Ok(Some(Container {
        generation: Generation::BinaryV2,
        metadata: Metadata::new(width, height, Algorithm::try_from(algorithm_id)?),
        payload: payload.to_vec(),
    }))
}

/// Previous generation: same fields, no checksum.
pub fn probe_v1(data: &[u8]) -> PzResult<Option<Container>> {
    if !data.starts_with(&MAGIC_V1) {
        return Ok(None);
    }
    if data.len() < HEADER_SIZE_V1 {
        return Err(PzError::InvalidInput(format!(
            "KOMPRSN1 header needs {HEADER_SIZE_V1} bytes, got {}",
            data.len()
        )));
    }
    let width = u32_at(data, 12);
    let height = u32_at(data, 16);
    let data_length = u32_at(data, 20);
    let algorithm_id = u32_at(data, 24);

    check_length(data, HEADER_SIZE_V1, data_length)?;
    checked_dimensions(width, height, &MAGIC_V1)?;

    Ok(Some(Container {
        generation: Generation::BinaryV1,
        metadata: Metadata::new(width, height, Algorithm::try_from(algorithm_id)?),
        payload: data[HEADER_SIZE_V1..].to_vec(),
    }))
}

/// Magic-less 12-byte header. Declines unless the length field agrees.
pub fn probe_numeric(data: &[u8]) -> PzResult<Option<Container>> {
    if data.len() <= HEADER_SIZE_NUMERIC {
        return Ok(None);
    }
    let width = u32_at(data, 0);
    let height = u32_at(data, 4);
    let length = u32_at(data, 8);
    if width == 0 || height == 0 || length as usize != data.len() - HEADER_SIZE_NUMERIC {
        return Ok(None);
    }
    Ok(Some(Container {
        generation: Generation::Numeric,
        metadata: Metadata::new(width, height, Algorithm::Zlib),
        payload: data[HEADER_SIZE_NUMERIC..].to_vec(),
    }))
}

/// The 6-byte header. Declines unless every field is plausible.
pub fn probe_earliest(data: &[u8]) -> PzResult<Option<Container>> {
    if data.len() <= HEADER_SIZE_EARLIEST {
        return Ok(None);
    }
    let width = u16_at(data, 0) as u32;
    let height = u16_at(data, 2) as u32;
    let layout = PixelLayout::from_tag(data[4]);
    let algorithm = Algorithm::try_from(data[5] as u32).ok();
    match (width, height, layout, algorithm) {
        (1.., 1.., Some(layout), Some(algorithm)) => Ok(Some(Container {
            generation: Generation::Earliest,
            metadata: Metadata::new(width, height, algorithm).with_layout(layout),
            payload: data[HEADER_SIZE_EARLIEST..].to_vec(),
        })),
        _ => Ok(None),
    }
}
