// src/archive/mod.rs

//! Sealed archives
//!
//! An archive is a signed envelope around an unsigned blob:
//!
//! ```text
//! envelope (CMS signed-data, DER)
//! └── blob
//!     ├── u32 LE manifest container length
//!     ├── manifest container   tar: "metas" -> manifest JSON
//!     └── payload container    tar: "<relative path>" -> file bytes
//! ```
//!
//! [`pack`] builds and signs an archive from a [`SourceSet`]; [`unpack`]
//! verifies the signature, pins the signer, checks every file against the
//! manifest, and only then writes anything.

pub mod blob;
pub mod container;
pub mod extract;
pub mod manifest;
pub mod payload;

pub use extract::{ExtractionReport, UnpackOptions, VerifiedBlob};
pub use manifest::{FileRecord, Manifest};

use crate::envelope::{self, PinnedFingerprint, SignerCertificate, SignerIdentity, TrustPolicy};
use crate::error::{Error, Result};
use crate::filesystem::SourceSet;
use crate::hash::{Hash, HashAlgorithm};
use manifest::CapturedFile;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Packing settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackOptions {
    /// Digest algorithm for file and payload digests
    pub algorithm: HashAlgorithm,
}

/// Outcome of [`pack`]
#[derive(Debug, Clone)]
pub struct PackReport {
    pub output: PathBuf,
    pub files: usize,
    /// Sum of packed file sizes
    pub bytes: u64,
    /// Size of the written archive
    pub archive_size: u64,
    pub signer: String,
    /// SHA-256 fingerprint of the signing certificate, for pinning
    pub fingerprint: Hash,
}

/// Outcome of [`unpack`]
#[derive(Debug, Clone)]
pub struct UnpackReport {
    pub signer: String,
    pub extraction: ExtractionReport,
}

/// A verified archive's contents, as reported by [`inspect`]
#[derive(Debug, Clone)]
pub struct Inspection {
    pub manifest: Manifest,
    pub signer: SignerCertificate,
    pub archive_size: u64,
}

/// Read every source file once and lay out the unsigned blob
pub fn build_blob(sources: &SourceSet, options: &PackOptions) -> Result<(Manifest, Vec<u8>)> {
    let captured = sources
        .iter()
        .map(|(key, path)| CapturedFile::capture(key, path, options.algorithm))
        .collect::<Result<Vec<_>>>()?;

    let payload = payload::assemble(&captured)?;
    let manifest = Manifest::build(options.algorithm, &captured, &payload)?;
    let blob = blob::compose(&manifest.to_container()?, &payload)?;

    debug!(
        "Built blob: {} files, payload {} bytes, blob {} bytes",
        manifest.len(),
        payload.len(),
        blob.len()
    );
    Ok((manifest, blob))
}

/// Pack `sources` into a signed archive at `output`
///
/// Loads the signer from `cert_path` and `key_path`; see [`pack_with`].
pub fn pack(
    sources: &SourceSet,
    output: &Path,
    cert_path: &Path,
    key_path: &Path,
    options: &PackOptions,
) -> Result<PackReport> {
    let identity = SignerIdentity::load(cert_path, key_path)?;
    pack_with(sources, output, &identity, options)
}

/// Pack `sources` into an archive signed by `identity`
///
/// The archive is written to a temporary file beside `output` and renamed
/// into place once complete, so `output` is never left half-written.
pub fn pack_with(
    sources: &SourceSet,
    output: &Path,
    identity: &SignerIdentity,
    options: &PackOptions,
) -> Result<PackReport> {
    let (manifest, blob) = build_blob(sources, options)?;
    let envelope = identity.seal(&blob)?;

    write_atomic(output, &envelope)?;

    let report = PackReport {
        output: output.to_path_buf(),
        files: manifest.len(),
        bytes: manifest.total_size(),
        archive_size: envelope.len() as u64,
        signer: identity.certificate().subject(),
        fingerprint: identity.fingerprint(HashAlgorithm::Sha256),
    };

    info!(
        "Packed {} files ({} bytes) into {}",
        report.files,
        report.bytes,
        output.display()
    );
    info!("Signed by {} ({})", report.signer, report.fingerprint.to_prefixed_string());
    Ok(report)
}

fn write_atomic(output: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent).map_err(Error::at(parent))?;
    tmp.write_all(bytes).map_err(Error::at(output))?;
    tmp.as_file().sync_all().map_err(Error::at(output))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o644))
            .map_err(Error::at(output))?;
    }

    tmp.persist(output).map_err(|e| Error::FileIo {
        path: output.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Read an archive and verify its envelope, returning the checked blob
fn open_archive(
    archive: &Path,
    trust: &dyn TrustPolicy,
) -> Result<(VerifiedBlob, SignerCertificate, u64)> {
    let bytes = fs::read(archive).map_err(Error::at(archive))?;
    let content = envelope::open(&bytes, trust)?;
    let verified = extract::verify_blob(&content.blob)?;
    Ok((verified, content.signer, bytes.len() as u64))
}

/// Verify an archive and extract it under `dest`
///
/// Nothing is written unless the signature verifies, `trust` accepts the
/// signer, and every payload entry matches the manifest.
pub fn unpack(
    archive: &Path,
    trust: &dyn TrustPolicy,
    dest: &Path,
    options: &UnpackOptions,
) -> Result<UnpackReport> {
    let (verified, signer, _) = open_archive(archive, trust)?;
    let signer = signer.subject();
    info!("Verified {} (signer {})", archive.display(), signer);

    let extraction = extract::extract(&verified, dest, options)?;
    Ok(UnpackReport { signer, extraction })
}

/// [`unpack`] with a single pinned fingerprint and default options
///
/// The fingerprint is parsed before the archive is opened.
pub fn unpack_pinned(archive: &Path, fingerprint: &str, dest: &Path) -> Result<UnpackReport> {
    let pin = PinnedFingerprint::parse(fingerprint)?;
    unpack(archive, &pin, dest, &UnpackOptions::default())
}

/// Verify an archive completely without extracting it
pub fn inspect(archive: &Path, trust: &dyn TrustPolicy) -> Result<Inspection> {
    let (verified, signer, archive_size) = open_archive(archive, trust)?;
    Ok(Inspection {
        manifest: verified.manifest,
        signer,
        archive_size,
    })
}
