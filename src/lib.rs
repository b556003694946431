// src/lib.rs

//! Sealpack: signed, tamper-evident directory archives
//!
//! A sealed archive bundles a directory tree with a manifest of per-file
//! digests and signs the whole thing with an X.509 certificate. Unpacking
//! only writes files after the signature verifies, the signer's certificate
//! fingerprint matches a pinned value, and every file matches the manifest.
//!
//! # Architecture
//!
//! - `hash`: SHA-2 digests for file contents and certificate fingerprints
//! - `filesystem`: source collection and destination path confinement
//! - `archive`: manifest, payload, blob framing, pack/unpack/inspect
//! - `envelope`: CMS signed-data envelope, signing, verification, trust
//! - `config`: trust files listing pinned fingerprints

pub mod archive;
pub mod config;
pub mod envelope;
mod error;
pub mod filesystem;
pub mod hash;

pub use archive::{
    inspect, pack, pack_with, unpack, unpack_pinned, Inspection, Manifest, PackOptions,
    PackReport, UnpackOptions, UnpackReport,
};
pub use config::TrustConfig;
pub use envelope::{
    FingerprintSet, PinnedFingerprint, SignerCertificate, SignerIdentity, TrustPolicy,
};
pub use error::{Error, ErrorKind, Result};
pub use filesystem::SourceSet;
pub use hash::{Hash, HashAlgorithm, Hasher};
