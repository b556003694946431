// src/error.rs

//! Error types for sealpack
//!
//! Every pack/unpack step fails fast with one of these variants. The
//! variants mirror the failure taxonomy of the archive format, so callers can
//! tell a damaged archive (`Format`, `IntegrityViolation`) apart from a
//! forged one (`SignatureInvalid`) or one from the wrong signer
//! (`CertificateNotTrusted`).

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for sealpack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while packing, signing, verifying, or unpacking archives
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error without a more specific location
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// I/O error on a specific file
    #[error("I/O error on {}: {source}", path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed container or envelope framing
    #[error("malformed archive: {0}")]
    Format(String),

    /// Malformed structured data (manifest document, envelope DER)
    #[error("parse error: {0}")]
    Parse(String),

    /// Certificate could not be loaded or is unusable for signing
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Private key does not belong to the certificate
    #[error("private key does not match certificate: certificate key {certificate}, private key {key}")]
    KeyMismatch { certificate: String, key: String },

    /// Any other failure while producing a signature
    #[error("signing failed: {0}")]
    Signing(String),

    /// Cryptographic verification of the envelope failed
    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    /// Signature is valid but the signer is not pinned
    #[error("certificate not trusted: expected {expected}, got {actual}")]
    CertificateNotTrusted { expected: String, actual: String },

    /// Payload content does not match the signed manifest
    #[error("integrity violation at {path}: {detail}")]
    IntegrityViolation { path: String, detail: String },

    /// An entry would be written outside the destination root
    #[error("path escapes destination root: {0}")]
    PathEscape(String),

    /// A source path cannot be turned into an archive key
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Nothing to pack
    #[error("no files to pack under {}", .0.display())]
    EmptySource(PathBuf),

    /// Fingerprint string could not be parsed
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Unknown digest algorithm name
    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Trust configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Format,
    Parse,
    Certificate,
    KeyMismatch,
    Signing,
    SignatureInvalid,
    CertificateNotTrusted,
    IntegrityViolation,
    PathEscape,
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::FileIo { .. } => ErrorKind::Io,
            Self::Format(_) => ErrorKind::Format,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Certificate(_) => ErrorKind::Certificate,
            Self::KeyMismatch { .. } => ErrorKind::KeyMismatch,
            Self::Signing(_) => ErrorKind::Signing,
            Self::SignatureInvalid(_) => ErrorKind::SignatureInvalid,
            Self::CertificateNotTrusted { .. } => ErrorKind::CertificateNotTrusted,
            Self::IntegrityViolation { .. } => ErrorKind::IntegrityViolation,
            Self::PathEscape(_) => ErrorKind::PathEscape,
            Self::InvalidPath(_)
            | Self::EmptySource(_)
            | Self::InvalidFingerprint(_)
            | Self::UnknownAlgorithm(_)
            | Self::Config(_) => ErrorKind::InvalidInput,
        }
    }

    /// Build an integrity violation for `path`
    pub fn integrity(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::IntegrityViolation {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Returns a closure that attaches `path` to an I/O error
    ///
    /// ```
    /// use sealpack::Error;
    /// use std::path::Path;
    ///
    /// let path = Path::new("/nonexistent/sealpack-doc");
    /// let err = std::fs::read(path).map_err(Error::at(path)).unwrap_err();
    /// assert!(err.to_string().contains("/nonexistent/sealpack-doc"));
    /// ```
    pub fn at(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::FileIo {
            path: path.to_path_buf(),
            source,
        }
    }
}
