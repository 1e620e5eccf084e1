//! Legacy text container (read only).
//!
//! ```text
//! KOMPRESSION-IMAGE
//! Width: 2
//! Height: 2
//! Type: rgb
//! Algorithm: zlib
//! DATA:
//! AAECAwQFBgcICQoL
//! ```
//!
//! Keys are case-insensitive; unknown keys are ignored. Everything after
//! the `DATA:` line is base64, line breaks allowed.
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::codec::Algorithm;
use crate::pixel::PixelLayout;
use crate::{PzError, PzResult};

use super::{dimension, Container, Generation, Metadata};

pub const BANNER: &str = "KOMPRESSION-IMAGE";
pub const DATA_MARKER: &str = "DATA:";

fn field<'a>(fields: &'a [(String, &'a str)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| *v)
}

fn parse_dimension(fields: &[(String, &str)], key: &str) -> PzResult<u32> {
    let raw = field(fields, key)
        .ok_or_else(|| PzError::InvalidMetadata(format!("legacy text header has no {key}")))?;
    let value: i64 = raw
        .parse()
        .map_err(|_| PzError::InvalidMetadata(format!("{key} '{raw}' is not a number")))?;
    dimension(value, key)
}

/// Claims blobs starting with the text banner.
pub fn probe(data: &[u8]) -> PzResult<Option<Container>> {
    if !data.starts_with(BANNER.as_bytes()) {
        return Ok(None);
    }
    let text = std::str::from_utf8(data)
        .map_err(|e| PzError::InvalidInput(format!("legacy text container: {e}")))?;

    let mut fields = Vec::new();
    let mut lines = text.lines().skip(1);
    let mut found_marker = false;
    for line in lines.by_ref() {
        let line = line.trim();
        if line == DATA_MARKER {
            found_marker = true;
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            fields.push((key.trim().to_ascii_lowercase(), value.trim()));
        }
    }
    if !found_marker {
        return Err(PzError::InvalidInput(format!(
            "legacy text container has no {DATA_MARKER} line"
        )));
    }
    let encoded: String = lines.flat_map(|l| l.split_whitespace()).collect();

    let metadata = Metadata {
        width: parse_dimension(&fields, "width")?,
        height: parse_dimension(&fields, "height")?,
        algorithm: match field(&fields, "algorithm") {
            Some(name) => name.parse()?,
            None => Algorithm::Zlib,
        },
        layout: field(&fields, "type")
            .map(str::parse::<PixelLayout>)
            .transpose()?,
    };

    Ok(Some(Container {
        generation: Generation::LegacyText,
        metadata,
        payload: STANDARD.decode(encoded)?,
    }))
}
