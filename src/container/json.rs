//! JSON envelopes.
//!
//! Compact form (written today):
//! `{"w": 2, "h": 2, "a": "zlib", "d": "<base64>"}`; `a` is optional and
//! defaults to zlib.
//!
//! Legacy form (read only):
//! `{"data": "<base64>", "metadata": {"width", "height", "type", "algorithm"}}`.
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::codec::Algorithm;
use crate::pixel::PixelLayout;
use crate::{PzError, PzResult};

use super::{dimension, Container, Generation, Metadata};

#[derive(Debug, Serialize, Deserialize)]
struct CompactEnvelope {
    w: i64,
    h: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    t: Option<String>,
    d: String,
}

/// The metadata record shared by the legacy JSON envelope and the ZIP
/// container's `metadata.json`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MetadataRecord {
    pub width: i64,
    pub height: i64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

impl MetadataRecord {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        MetadataRecord {
            width: metadata.width as i64,
            height: metadata.height as i64,
            kind: metadata.layout.map(|l| l.name().to_string()),
            algorithm: Some(metadata.algorithm.name().to_string()),
        }
    }

    pub fn to_metadata(&self) -> PzResult<Metadata> {
        resolve(
            self.width,
            self.height,
            self.algorithm.as_deref(),
            self.kind.as_deref(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct LegacyEnvelope {
    data: String,
    metadata: MetadataRecord,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    Compact(CompactEnvelope),
    Legacy(LegacyEnvelope),
}

fn resolve(
    width: i64,
    height: i64,
    algorithm: Option<&str>,
    kind: Option<&str>,
) -> PzResult<Metadata> {
    let algorithm = match algorithm {
        Some(name) => name.parse()?,
        None => Algorithm::Zlib,
    };
    Ok(Metadata {
        width: dimension(width, "width")?,
        height: dimension(height, "height")?,
        algorithm,
        layout: kind.map(str::parse::<PixelLayout>).transpose()?,
    })
}

/// Serialize the compact envelope.
pub fn write_compact(payload: &[u8], metadata: &Metadata) -> PzResult<Vec<u8>> {
    let envelope = CompactEnvelope {
        w: metadata.width as i64,
        h: metadata.height as i64,
        a: Some(metadata.algorithm.name().to_string()),
        t: metadata.layout.map(|l| l.name().to_string()),
        d: STANDARD.encode(payload),
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Claims blobs that parse as a JSON object.
///
/// A leading `{` alone is not enough: the magic-less binary headers start
/// with the width, whose low byte can be 0x7B.
pub fn probe(data: &[u8]) -> PzResult<Option<Container>> {
    if data.iter().find(|b| !b.is_ascii_whitespace()) != Some(&b'{') {
        return Ok(None);
    }
    let value: serde_json::Value = match serde_json::from_slice(data) {
        Ok(value) => value,
        Err(e) => {
            log::trace!("not JSON: {e}");
            return Ok(None);
        }
    };
    let envelope: Envelope = serde_json::from_value(value).map_err(|_| {
        PzError::InvalidInput("JSON is neither a compact {w,h,d} nor a legacy {data,metadata} envelope".into())
    })?;

    let (generation, metadata, encoded) = match envelope {
        Envelope::Compact(c) => (
            Generation::CompactJson,
            resolve(c.w, c.h, c.a.as_deref(), c.t.as_deref())?,
            c.d,
        ),
        Envelope::Legacy(l) => (Generation::LegacyJson, l.metadata.to_metadata()?, l.data),
    };
    Ok(Some(Container {
        generation,
        metadata,
        payload: STANDARD.decode(encoded.trim())?,
    }))
}
