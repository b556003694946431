// src/archive/blob.rs

//! Unsigned blob framing
//!
//! ```text
//! bytes[0..4]                 manifest container length (u32, little-endian)
//! bytes[4..4+len]             manifest container
//! bytes[4+len..]              payload container
//! ```

use crate::error::{Error, Result};

/// Size of the length prefix
pub const PREFIX_LEN: usize = 4;

/// Concatenate the two sub-containers behind a length prefix
pub fn compose(manifest_container: &[u8], payload_container: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(manifest_container.len()).map_err(|_| {
        Error::Format(format!(
            "manifest container is {} bytes, larger than a u32 prefix can describe",
            manifest_container.len()
        ))
    })?;

    let mut blob =
        Vec::with_capacity(PREFIX_LEN + manifest_container.len() + payload_container.len());
    blob.extend_from_slice(&len.to_le_bytes());
    blob.extend_from_slice(manifest_container);
    blob.extend_from_slice(payload_container);
    Ok(blob)
}

/// Split a blob into `(manifest container, payload container)`
pub fn split(blob: &[u8]) -> Result<(&[u8], &[u8])> {
    let Some((prefix, rest)) = blob.split_first_chunk::<PREFIX_LEN>() else {
        return Err(Error::Format(format!(
            "blob is {} bytes, too short for the length prefix",
            blob.len()
        )));
    };

    let manifest_len = u32::from_le_bytes(*prefix) as usize;
    if manifest_len > rest.len() {
        return Err(Error::Format(format!(
            "manifest length prefix {} exceeds the {} bytes that follow it",
            manifest_len,
            rest.len()
        )));
    }

    Ok(rest.split_at(manifest_len))
}
