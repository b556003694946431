// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use sealpack::archive::blob;
use sealpack::archive::manifest::{FileRecord, Manifest, MANIFEST_VERSION};
use sealpack::hash::{self, HashAlgorithm};
use sealpack::SignerIdentity;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// A scratch directory holding a saved signer and a source tree.
///
/// Keep the struct alive for the duration of the test; dropping it removes
/// every file it created.
pub struct Fixture {
    pub dir: TempDir,
    pub identity: SignerIdentity,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub source: PathBuf,
}

impl Fixture {
    /// Path for a file inside the scratch directory
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// SHA-256 fingerprint of the fixture signer, as a plain hex string
    pub fn pin(&self) -> String {
        self.identity.fingerprint(HashAlgorithm::Sha256).to_hex()
    }
}

/// Create a fixture whose source tree holds `a.txt` = "hello" and
/// `sub/b.txt` = "world".
pub fn fixture() -> Fixture {
    fixture_with(&[("a.txt", b"hello"), ("sub/b.txt", b"world")])
}

/// Create a fixture with the given source files.
pub fn fixture_with(files: &[(&str, &[u8])]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let identity = SignerIdentity::generate("integration signer", 1).unwrap();
    let cert_path = dir.path().join("signer.crt");
    let key_path = dir.path().join("signer.key");
    identity.save(&cert_path, &key_path).unwrap();

    let source = dir.path().join("source");
    write_tree(&source, files);

    Fixture {
        dir,
        identity,
        cert_path,
        key_path,
        source,
    }
}

/// Write `files` under `root`, creating parent directories.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    fs::create_dir_all(root).unwrap();
    for (name, content) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

/// Relative paths of every regular file under `root`, sorted.
pub fn list_files(root: &Path) -> Vec<String> {
    if !root.exists() {
        return Vec::new();
    }
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

/// Build a tar container with names written verbatim into the header,
/// so tests can use names the tar builder itself would refuse.
pub fn raw_container(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(1_700_000_000);
        header.set_cksum();
        builder.append(&header, *data).unwrap();
    }
    builder.into_inner().unwrap()
}

/// Manifest vouching for `records` against the given payload container.
pub fn manifest_for(records: &[(&str, &[u8])], payload: &[u8]) -> Manifest {
    let algorithm = HashAlgorithm::Sha256;
    let files: BTreeMap<String, FileRecord> = records
        .iter()
        .map(|(name, data)| {
            let record = FileRecord {
                name: name.rsplit('/').next().unwrap().to_string(),
                size: data.len() as u64,
                modified_at: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
                digest: hash::hash_bytes(algorithm, data).to_hex(),
            };
            (name.to_string(), record)
        })
        .collect();

    Manifest {
        version: MANIFEST_VERSION,
        algorithm,
        payload_digest: hash::hash_bytes(algorithm, payload).to_hex(),
        files,
    }
}

/// Blob whose manifest honestly describes a hand-built payload.
pub fn crafted_blob(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let payload = raw_container(entries);
    let manifest = manifest_for(entries, &payload);
    blob::compose(&manifest.to_container().unwrap(), &payload).unwrap()
}

/// Sign `blob` with the fixture's signer and write it as an archive.
pub fn write_sealed(fixture: &Fixture, name: &str, blob: &[u8]) -> PathBuf {
    let path = fixture.path(name);
    fs::write(&path, fixture.identity.seal(blob).unwrap()).unwrap();
    path
}

/// Position of `needle` inside `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle not found")
}
