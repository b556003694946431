// src/archive/manifest.rs

//! Archive manifest
//!
//! The manifest maps every root-relative path in the payload to a
//! [`FileRecord`] holding its size, modification time, and content digest.
//! It is serialized as pretty-printed JSON and stored as the single `metas`
//! entry of its own sub-container, so it can be read without touching the
//! payload.

use super::container::{read_entries, ContainerFault, ContainerWriter};
use crate::error::{Error, Result};
use crate::hash::{self, Hash, HashAlgorithm};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::time::SystemTime;

/// Name of the only entry in the manifest container
pub const MANIFEST_ENTRY: &str = "metas";

/// Manifest document version written by this crate
pub const MANIFEST_VERSION: u32 = 1;

/// Metadata and digest for one packaged file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Base name of the file
    pub name: String,
    /// Size in bytes (informational)
    pub size: u64,
    /// Last modification time (informational)
    pub modified_at: DateTime<Utc>,
    /// Hex content digest, algorithm given by the manifest
    pub digest: String,
}

/// A source file read once and fully, ready for both manifest and payload
#[derive(Debug, Clone)]
pub struct CapturedFile {
    /// Root-relative archive key
    pub key: String,
    /// Manifest record for the file
    pub record: FileRecord,
    /// Raw file bytes
    pub content: Vec<u8>,
}

impl CapturedFile {
    /// Open `path`, read it to the end, and record its metadata and digest
    pub fn capture(key: &str, path: &Path, algorithm: HashAlgorithm) -> Result<Self> {
        let mut file = File::open(path).map_err(Error::at(path))?;
        let metadata = file.metadata().map_err(Error::at(path))?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        let (digest, content) = hash::hash_reader(algorithm, &mut file).map_err(Error::at(path))?;

        let name = key.rsplit('/').next().unwrap_or(key).to_string();

        Ok(Self {
            key: key.to_string(),
            record: FileRecord {
                name,
                size: content.len() as u64,
                modified_at: DateTime::<Utc>::from(modified),
                digest: digest.to_hex(),
            },
            content,
        })
    }

    /// Modification time as whole seconds since the epoch, clamped at zero
    pub fn mtime(&self) -> u64 {
        self.record.modified_at.timestamp().max(0) as u64
    }
}

/// Path -> record mapping plus the digests that bind it to the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Document version
    pub version: u32,
    /// Algorithm for every digest in this manifest
    pub algorithm: HashAlgorithm,
    /// Digest of the complete payload container bytes
    pub payload_digest: String,
    /// Per-file records keyed by root-relative path
    pub files: BTreeMap<String, FileRecord>,
}

impl Manifest {
    /// Build a manifest from captured files and the finished payload container
    ///
    /// Fails if two captures share a key.
    pub fn build(
        algorithm: HashAlgorithm,
        files: &[CapturedFile],
        payload_container: &[u8],
    ) -> Result<Self> {
        let mut records = BTreeMap::new();
        for file in files {
            if records.insert(file.key.clone(), file.record.clone()).is_some() {
                return Err(Error::InvalidPath(format!("duplicate archive key {}", file.key)));
            }
        }

        Ok(Self {
            version: MANIFEST_VERSION,
            algorithm,
            payload_digest: hash::hash_bytes(algorithm, payload_container).to_hex(),
            files: records,
        })
    }

    /// Number of file records
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if the manifest lists no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Look up the record for a path
    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    /// Sum of recorded file sizes
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|r| r.size).sum()
    }

    /// Expected digest of the payload container
    pub fn payload_hash(&self) -> Result<Hash> {
        Hash::from_hex(self.algorithm, &self.payload_digest)
            .map_err(|e| Error::Parse(format!("payload_digest: {}", e)))
    }

    /// Expected digest of one file
    pub fn file_hash(&self, path: &str) -> Option<Result<Hash>> {
        self.files.get(path).map(|record| {
            Hash::from_hex(self.algorithm, &record.digest)
                .map_err(|e| Error::Parse(format!("digest for {}: {}", path, e)))
        })
    }

    /// Serialize to the JSON document stored in the container
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Parse and validate the JSON document
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let manifest: Self =
            serde_json::from_slice(bytes).map_err(|e| Error::Parse(format!("manifest: {}", e)))?;

        if manifest.version != MANIFEST_VERSION {
            return Err(Error::Parse(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }

        // Digests must be well-formed before anything is compared against them
        manifest.payload_hash()?;
        for path in manifest.files.keys() {
            if let Some(hash) = manifest.file_hash(path) {
                hash?;
            }
        }

        Ok(manifest)
    }

    /// Wrap the serialized manifest in its single-entry container
    pub fn to_container(&self) -> Result<Vec<u8>> {
        let mut writer = ContainerWriter::new();
        writer.append(MANIFEST_ENTRY, 0, &self.to_json()?)?;
        writer.finish()
    }

    /// Recover a manifest from its container bytes
    pub fn from_container(bytes: &[u8]) -> Result<Self> {
        let entries = read_entries(bytes).map_err(|fault: ContainerFault| {
            Error::Format(format!("manifest container: {}", fault))
        })?;

        match entries.as_slice() {
            [entry] if entry.name == MANIFEST_ENTRY => Self::from_json(&entry.data),
            [entry] => Err(Error::Format(format!(
                "manifest container entry is {:?}, expected {:?}",
                entry.name, MANIFEST_ENTRY
            ))),
            _ => Err(Error::Format(format!(
                "manifest container holds {} entries, expected 1",
                entries.len()
            ))),
        }
    }
}
