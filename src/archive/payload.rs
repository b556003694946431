// src/archive/payload.rs

//! Payload container
//!
//! Raw file contents, one entry per file, named by the same root-relative
//! keys the manifest uses.

use super::container::{read_entries, ContainerEntry, ContainerFault, ContainerWriter};
use super::manifest::CapturedFile;
use crate::error::{Error, Result};
use tracing::debug;

/// Pack captured file contents into a payload container
pub fn assemble(files: &[CapturedFile]) -> Result<Vec<u8>> {
    let mut writer = ContainerWriter::new();
    for file in files {
        writer.append(&file.key, file.mtime(), &file.content)?;
        debug!("Added {} ({} bytes) to payload", file.key, file.content.len());
    }
    writer.finish()
}

/// Decode the payload container's entries
///
/// The payload is only trusted through the manifest's digests, so a payload
/// that cannot even be decoded is reported as an integrity violation rather
/// than a framing error.
pub fn read_payload(bytes: &[u8]) -> Result<Vec<ContainerEntry>> {
    read_entries(bytes).map_err(|fault: ContainerFault| {
        let path = fault.entry_name().unwrap_or("<payload>").to_string();
        Error::integrity(path, fault.to_string())
    })
}
