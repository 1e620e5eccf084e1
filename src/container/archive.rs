//! ZIP container: `metadata.json` plus the payload as `data.bin`.
//!
//! Older archives named the payload entry `image.dat`; both are read.
//! The payload is already compressed, so entries are written stored.
use std::io::{Cursor, Read, Write};

use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{PzError, PzResult};

use super::json::MetadataRecord;
use super::{Container, Generation, Metadata};

pub const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";
pub const METADATA_ENTRY: &str = "metadata.json";
pub const DATA_ENTRY: &str = "data.bin";
pub const LEGACY_DATA_ENTRY: &str = "image.dat";

/// Serialize a ZIP container.
pub fn write(payload: &[u8], metadata: &Metadata) -> PzResult<Vec<u8>> {
    let record = serde_json::to_vec_pretty(&MetadataRecord::from_metadata(metadata))?;
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(METADATA_ENTRY, options)?;
    zip.write_all(&record)?;
    zip.start_file(DATA_ENTRY, options)?;
    zip.write_all(payload)?;
    Ok(zip.finish()?.into_inner())
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> PzResult<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(Some(buf))
}

/// Claims blobs starting with a local file header.
pub fn probe(data: &[u8]) -> PzResult<Option<Container>> {
    if !data.starts_with(&ZIP_MAGIC) {
        return Ok(None);
    }
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let record = read_entry(&mut archive, METADATA_ENTRY)?.ok_or_else(|| {
        PzError::InvalidInput(format!("zip container has no {METADATA_ENTRY}"))
    })?;
    let record: MetadataRecord = serde_json::from_slice(&record)?;

    let payload = match read_entry(&mut archive, DATA_ENTRY)? {
        Some(payload) => payload,
        None => read_entry(&mut archive, LEGACY_DATA_ENTRY)?.ok_or_else(|| {
            PzError::InvalidInput(format!(
                "zip container has neither {DATA_ENTRY} nor {LEGACY_DATA_ENTRY}"
            ))
        })?,
    };

    Ok(Some(Container {
        generation: Generation::Zip,
        metadata: record.to_metadata()?,
        payload,
    }))
}
