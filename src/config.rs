// src/config.rs

//! Trust configuration files
//!
//! A trust file lists the certificate fingerprints an unpacker accepts:
//!
//! ```toml
//! fingerprints = [
//!     "sha256:3f9a...",
//!     "AB:CD:...",
//! ]
//! ```

use crate::envelope::FingerprintSet;
use crate::error::{Error, Result};
use crate::hash::Hash;
use serde::Deserialize;
use std::path::Path;

/// Parsed trust file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustConfig {
    pub fingerprints: Vec<Hash>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TrustFile {
    #[serde(default)]
    fingerprints: Vec<String>,
}

impl TrustConfig {
    /// Load a trust file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::at(path))?;
        Self::from_toml(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parse a trust file's contents
    ///
    /// An empty fingerprint list is rejected: a trust file that trusts
    /// nothing is always a mistake.
    pub fn from_toml(content: &str) -> Result<Self> {
        let parsed: TrustFile =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;

        if parsed.fingerprints.is_empty() {
            return Err(Error::Config("no fingerprints listed".to_string()));
        }

        let fingerprints = parsed
            .fingerprints
            .iter()
            .map(|s| {
                Hash::parse(s).map_err(|e| Error::Config(format!("fingerprint {:?}: {}", s, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { fingerprints })
    }

    /// The trust policy this file describes
    pub fn policy(&self) -> FingerprintSet {
        FingerprintSet::new(self.fingerprints.clone())
    }
}
