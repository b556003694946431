// src/archive/container.rs

//! Named-entry sub-containers
//!
//! Both the manifest and the payload are stored as plain tar streams held
//! in memory. Headers are normalized (fixed mode, zero owner) so the same
//! input always produces the same bytes.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::io::Read;

/// Mode recorded for every entry
const ENTRY_MODE: u32 = 0o644;

/// One named entry in a sub-container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    /// Root-relative, `/`-separated entry name
    pub name: String,
    /// Modification time in seconds since the Unix epoch
    pub mtime: u64,
    /// Raw entry bytes
    pub data: Vec<u8>,
}

/// Why an entry list could not be read
///
/// The manifest and payload readers map these onto different error kinds,
/// so the reader itself stays neutral.
#[derive(Debug)]
pub enum ContainerFault {
    /// The tar stream itself is damaged
    Corrupt(String),
    /// An entry is something other than a regular file
    UnsupportedEntry { name: String, kind: String },
    /// Two entries share a name
    Duplicate(String),
}

impl ContainerFault {
    /// Entry name the fault refers to, if any
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Self::Corrupt(_) => None,
            Self::UnsupportedEntry { name, .. } | Self::Duplicate(name) => Some(name),
        }
    }
}

impl std::fmt::Display for ContainerFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Corrupt(msg) => write!(f, "corrupt container: {}", msg),
            Self::UnsupportedEntry { name, kind } => {
                write!(f, "unsupported {} entry {}", kind, name)
            }
            Self::Duplicate(name) => write!(f, "duplicate entry {}", name),
        }
    }
}

/// Builds a sub-container in memory
pub struct ContainerWriter {
    builder: tar::Builder<Vec<u8>>,
    names: HashSet<String>,
}

impl ContainerWriter {
    /// Create an empty container
    pub fn new() -> Self {
        let mut builder = tar::Builder::new(Vec::new());
        builder.mode(tar::HeaderMode::Deterministic);
        Self {
            builder,
            names: HashSet::new(),
        }
    }

    /// Append a regular-file entry
    pub fn append(&mut self, name: &str, mtime: u64, data: &[u8]) -> Result<()> {
        if !self.names.insert(name.to_string()) {
            return Err(Error::Format(format!("duplicate container entry {}", name)));
        }

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_mode(ENTRY_MODE);
        header.set_uid(0);
        header.set_gid(0);
        header.set_size(data.len() as u64);
        header.set_mtime(mtime);
        header.set_cksum();

        self.builder.append_data(&mut header, name, data)?;
        Ok(())
    }

    /// Number of entries appended so far
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Finish the tar stream and return its bytes
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.builder.into_inner()?)
    }
}

impl Default for ContainerWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Read every regular-file entry of a container, in stream order
///
/// Directory entries are skipped. Links, devices and other special entries
/// are rejected, as are duplicate names.
pub fn read_entries(bytes: &[u8]) -> std::result::Result<Vec<ContainerEntry>, ContainerFault> {
    let corrupt = |e: std::io::Error| ContainerFault::Corrupt(e.to_string());

    let mut archive = tar::Archive::new(bytes);
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        let name = entry_name(&entry)?;

        match entry.header().entry_type() {
            tar::EntryType::Regular | tar::EntryType::Continuous => {}
            tar::EntryType::Directory => continue,
            other => {
                return Err(ContainerFault::UnsupportedEntry {
                    name,
                    kind: format!("{:?}", other).to_lowercase(),
                });
            }
        }

        if !seen.insert(name.clone()) {
            return Err(ContainerFault::Duplicate(name));
        }

        let mtime = entry.header().mtime().map_err(corrupt)?;
        // The header size is untrusted; never reserve more than the stream holds
        let capacity = usize::try_from(entry.size()).unwrap_or(usize::MAX).min(bytes.len());
        let mut data = Vec::with_capacity(capacity);
        entry.read_to_end(&mut data).map_err(corrupt)?;

        entries.push(ContainerEntry { name, mtime, data });
    }

    Ok(entries)
}

/// Raw entry name exactly as stored, without any normalization
fn entry_name<R: Read>(entry: &tar::Entry<'_, R>) -> std::result::Result<String, ContainerFault> {
    let raw = entry.path_bytes();
    String::from_utf8(raw.into_owned())
        .map_err(|_| ContainerFault::Corrupt("entry name is not valid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_entries() {
        let mut writer = ContainerWriter::new();
        writer.append("a.txt", 1_700_000_000, b"hello").unwrap();
        writer.append("sub/b.txt", 0, b"world").unwrap();
        assert_eq!(writer.len(), 2);
        let bytes = writer.finish().unwrap();

        let entries = read_entries(&bytes).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].data, b"hello");
        assert_eq!(entries[0].mtime, 1_700_000_000);
        assert_eq!(entries[1].name, "sub/b.txt");
        assert_eq!(entries[1].data, b"world");
    }

    #[test]
    fn test_long_names_survive() {
        let long = format!("{}/file.txt", "d".repeat(150));
        let mut writer = ContainerWriter::new();
        writer.append(&long, 0, b"x").unwrap();
        let entries = read_entries(&writer.finish().unwrap()).unwrap();
        assert_eq!(entries[0].name, long);
    }

    #[test]
    fn test_output_is_deterministic() {
        let build = || {
            let mut writer = ContainerWriter::new();
            writer.append("a.txt", 42, b"hello").unwrap();
            writer.finish().unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_writer_rejects_duplicates() {
        let mut writer = ContainerWriter::new();
        writer.append("a.txt", 0, b"1").unwrap();
        assert!(writer.append("a.txt", 0, b"2").is_err());
    }

    #[test]
    fn test_reader_rejects_duplicates() {
        let mut builder = tar::Builder::new(Vec::new());
        for data in [b"1", b"2"] {
            let mut header = tar::Header::new_gnu();
            header.set_size(1);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, "a.txt", &data[..]).unwrap();
        }
        let bytes = builder.into_inner().unwrap();

        let fault = read_entries(&bytes).unwrap_err();
        assert!(matches!(fault, ContainerFault::Duplicate(ref n) if n == "a.txt"));
    }

    #[test]
    fn test_reader_rejects_symlinks() {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        builder
            .append_link(&mut header, "evil", "/etc/passwd")
            .unwrap();
        let bytes = builder.into_inner().unwrap();

        let fault = read_entries(&bytes).unwrap_err();
        assert!(matches!(fault, ContainerFault::UnsupportedEntry { .. }));
        assert_eq!(fault.entry_name(), Some("evil"));
    }

    #[test]
    fn test_reader_rejects_oversized_header_size() {
        let mut header = tar::Header::new_gnu();
        header.set_path("big.bin").unwrap();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(1 << 40);
        header.set_cksum();

        let mut bytes = header.as_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 512]);

        assert!(read_entries(&bytes).is_err());
    }

    #[test]
    fn test_reader_rejects_garbage() {
        let garbage = vec![0x5au8; 1024];
        assert!(matches!(
            read_entries(&garbage).unwrap_err(),
            ContainerFault::Corrupt(_)
        ));
    }
}
