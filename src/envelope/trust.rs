// src/envelope/trust.rs

//! Signer trust decisions
//!
//! A valid signature only proves that *someone* holding the embedded
//! certificate's key signed the blob. Which certificates count is decided
//! here, by pinning certificate fingerprints.

use super::SignerCertificate;
use crate::error::{Error, Result};
use crate::hash::{digests_equal, Hash};

/// Decides whether a signer certificate is acceptable
pub trait TrustPolicy {
    /// Accept `certificate`, or fail with `CertificateNotTrusted`
    fn check(&self, certificate: &SignerCertificate) -> Result<()>;
}

/// Trust exactly one certificate, identified by its fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedFingerprint(Hash);

impl PinnedFingerprint {
    pub fn new(fingerprint: Hash) -> Self {
        Self(fingerprint)
    }

    /// Parse a fingerprint string (see [`Hash::parse`] for accepted forms)
    pub fn parse(fingerprint: &str) -> Result<Self> {
        Hash::parse(fingerprint).map(Self)
    }

    pub fn fingerprint(&self) -> &Hash {
        &self.0
    }
}

impl TrustPolicy for PinnedFingerprint {
    fn check(&self, certificate: &SignerCertificate) -> Result<()> {
        let actual = certificate.fingerprint(self.0.algorithm);
        if digests_equal(&self.0, &actual) {
            Ok(())
        } else {
            Err(Error::CertificateNotTrusted {
                expected: self.0.to_hex(),
                actual: actual.to_hex(),
            })
        }
    }
}

/// Trust any of several pinned certificates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintSet {
    pins: Vec<Hash>,
}

impl FingerprintSet {
    pub fn new(pins: Vec<Hash>) -> Self {
        Self { pins }
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn pins(&self) -> &[Hash] {
        &self.pins
    }
}

impl TrustPolicy for FingerprintSet {
    fn check(&self, certificate: &SignerCertificate) -> Result<()> {
        let matched = self
            .pins
            .iter()
            .any(|pin| digests_equal(pin, &certificate.fingerprint(pin.algorithm)));
        if matched {
            return Ok(());
        }

        let expected = if self.pins.is_empty() {
            "no pinned certificates".to_string()
        } else {
            format!(
                "one of [{}]",
                self.pins.iter().map(Hash::to_prefixed_string).collect::<Vec<_>>().join(", ")
            )
        };
        let algorithm = self.pins.first().map(|p| p.algorithm).unwrap_or_default();

        Err(Error::CertificateNotTrusted {
            expected,
            actual: certificate.fingerprint(algorithm).to_prefixed_string(),
        })
    }
}
