//! Container formats.
//!
//! A container makes a compressed payload self-describing: it records
//! the image dimensions, the compression algorithm and, for the current
//! binary generation, a CRC-32 of the payload.
//!
//! Eight generations of envelope have been written over time and all of
//! them stay readable. New data is only ever written as [`binary`] v2,
//! or as compact JSON / ZIP when a text-safe or archive form is wanted.
//!
//! Reading probes the generations in a fixed order, most specific first,
//! because some byte patterns are ambiguous: a 12-byte numeric header can
//! also pass the 6-byte check. A probe either declines (`Ok(None)`),
//! claims the blob (`Ok(Some(_))`), or claims it and reports why it is
//! broken (`Err(_)`); the first probe that does not decline decides.
//! JSON only claims blobs that parse as JSON, so a numeric or earliest
//! header whose width byte is `{` still reaches its own probe. A
//! magic-less header that spells the ZIP or JPEG signature cannot.
//!
//! | Order | Generation       | Signature                          |
//! |-------|------------------|------------------------------------|
//! | 1     | JPEG (rejected)  | `FF D8 FF`                         |
//! | 2     | legacy text      | `KOMPRESSION-IMAGE` banner         |
//! | 3     | ZIP              | `PK\x03\x04`                       |
//! | 4     | JSON             | first non-blank byte is `{`        |
//! | 5     | binary v2        | `KOMPRSN2`, 36-byte header, CRC-32 |
//! | 6     | binary v1        | `KOMPRSN1`, 32-byte header         |
//! | 7     | numeric          | 12-byte header, length must agree  |
//! | 8     | earliest         | 6-byte header, last resort         |

pub mod archive;
pub mod binary;
pub mod json;
pub mod text;

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::Algorithm;
use crate::pixel::{self, PixelLayout};
use crate::{PzError, PzResult};

/// Which envelope generation a blob was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    LegacyText,
    Zip,
    CompactJson,
    LegacyJson,
    BinaryV2,
    BinaryV1,
    Numeric,
    Earliest,
}

impl Generation {
    pub fn name(self) -> &'static str {
        match self {
            Generation::LegacyText => "legacy-text",
            Generation::Zip => "zip",
            Generation::CompactJson => "json",
            Generation::LegacyJson => "legacy-json",
            Generation::BinaryV2 => "binary-v2",
            Generation::BinaryV1 => "binary-v1",
            Generation::Numeric => "numeric",
            Generation::Earliest => "earliest",
        }
    }

    /// True for generations that are only read, never written.
    pub fn is_legacy(self) -> bool {
        !matches!(
            self,
            Generation::BinaryV2 | Generation::CompactJson | Generation::Zip
        )
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Envelope kinds new data can be written as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Binary,
    Json,
    Zip,
}

impl FromStr for OutputFormat {
    type Err = PzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "bin" => Ok(OutputFormat::Binary),
            "json" => Ok(OutputFormat::Json),
            "zip" => Ok(OutputFormat::Zip),
            other => Err(PzError::Unsupported(format!("output format '{other}'"))),
        }
    }
}

/// What a container says about its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub width: u32,
    pub height: u32,
    pub algorithm: Algorithm,
    /// Only some generations record the layout; otherwise it is
    /// recovered from the decompressed length.
    pub layout: Option<PixelLayout>,
}

impl Metadata {
    pub fn new(width: u32, height: u32, algorithm: Algorithm) -> Self {
        Metadata {
            width,
            height,
            algorithm,
            layout: None,
        }
    }

    pub fn with_layout(mut self, layout: PixelLayout) -> Self {
        self.layout = Some(layout);
        self
    }
}

/// A parsed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub generation: Generation,
    pub metadata: Metadata,
    pub payload: Vec<u8>,
}

type Probe = fn(&[u8]) -> PzResult<Option<Container>>;

/// Recognizers in priority order.
const PROBES: [(&str, Probe); 8] = [
    ("jpeg", probe_jpeg),
    ("legacy-text", text::probe),
    ("zip", archive::probe),
    ("json", json::probe),
    ("binary-v2", binary::probe_v2),
    ("binary-v1", binary::probe_v1),
    ("numeric", binary::probe_numeric),
    ("earliest", binary::probe_earliest),
];

const JPEG_SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];

fn probe_jpeg(data: &[u8]) -> PzResult<Option<Container>> {
    if data.starts_with(&JPEG_SOI) {
        return Err(PzError::UnsupportedFormat(
            "JPEG renderings are output-only and cannot be decoded back",
        ));
    }
    Ok(None)
}

/// Detect the generation of `data` and parse it.
pub fn read(data: &[u8]) -> PzResult<Container> {
    for (name, probe) in PROBES {
        log::trace!("probing {name} ({} bytes)", data.len());
        if let Some(container) = probe(data)? {
            log::debug!(
                "read {} container: {}x{} {} ({} payload bytes)",
                container.generation,
                container.metadata.width,
                container.metadata.height,
                container.metadata.algorithm,
                container.payload.len()
            );
            if container.generation.is_legacy() {
                log::warn!("{} container is a legacy format", container.generation);
            }
            return Ok(container);
        }
    }
    Err(PzError::UnrecognizedFormat)
}

/// Wrap `payload` in a new container.
pub fn write(payload: &[u8], metadata: &Metadata, format: OutputFormat) -> PzResult<Vec<u8>> {
    if payload.is_empty() {
        return Err(PzError::EmptyInput);
    }
    pixel::validate_dimensions(metadata.width, metadata.height)?;
    match format {
        OutputFormat::Binary => binary::write_v2(payload, metadata),
        OutputFormat::Json => json::write_compact(payload, metadata),
        OutputFormat::Zip => archive::write(payload, metadata),
    }
}

/// Write `bytes` to `path`, read them back and compare.
///
/// On any difference the file is removed and
/// [`PzError::IntegrityError`] returned. A write error removes the
/// partial file and is returned as [`PzError::Io`].
pub fn write_file_verified(path: &Path, bytes: &[u8]) -> PzResult<()> {
    write_then_verify(path, bytes, |path, bytes| fs::write(path, bytes))
}

/// A failed write also removes whatever part of the file was written.
fn write_then_verify(
    path: &Path,
    bytes: &[u8],
    write: impl FnOnce(&Path, &[u8]) -> std::io::Result<()>,
) -> PzResult<()> {
    if let Err(e) = write(path, bytes) {
        log::error!("{}: write failed: {e}", path.display());
        remove_partial(path);
        return Err(e.into());
    }
    let ok = matches!(fs::read(path), Ok(back) if back == bytes);
    if !ok {
        log::error!("{}: read-back differs from written bytes", path.display());
        remove_partial(path);
        return Err(PzError::IntegrityError(path.to_path_buf()));
    }
    log::debug!("{}: wrote and verified {} bytes", path.display(), bytes.len());
    Ok(())
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("{}: could not remove partial file: {e}", path.display()),
    }
}

/// Header summary of a container, without decompressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub generation: Generation,
    pub metadata: Metadata,
    pub container_size: usize,
    pub payload_size: usize,
}

/// Detect and summarize a container.
pub fn inspect(data: &[u8]) -> PzResult<Info> {
    let container = read(data)?;
    Ok(Info {
        generation: container.generation,
        metadata: container.metadata,
        container_size: data.len(),
        payload_size: container.payload.len(),
    })
}

/// Parse a dimension from a text or JSON field.
pub(crate) fn dimension(value: i64, what: &str) -> PzResult<u32> {
    u32::try_from(value)
        .ok()
        .filter(|&v| v > 0)
        .ok_or_else(|| PzError::InvalidMetadata(format!("{what} must be positive, got {value}")))
}
