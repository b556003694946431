// src/envelope/certificate.rs

//! Signer certificates
//!
//! Loads X.509 certificates from PEM or DER, extracts their Ed25519 public
//! key, computes pinning fingerprints, and issues self-signed certificates
//! for `keygen`.

use super::{ID_ED25519, SignatureScheme};
use crate::error::{Error, Result};
use crate::hash::{self, Hash, HashAlgorithm};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use x509_cert::der::asn1::BitString;
use x509_cert::der::{Decode, Encode};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::Validity;
use x509_cert::{Certificate, TbsCertificate, Version};

/// A parsed certificate together with its DER encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerCertificate {
    certificate: Certificate,
    der: Vec<u8>,
}

impl SignerCertificate {
    /// Parse a DER-encoded certificate
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let certificate = Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("invalid DER certificate: {}", e)))?;
        Self::from_certificate(certificate)
    }

    /// Parse a certificate from PEM (`CERTIFICATE` block) or raw DER bytes
    pub fn from_pem_or_der(bytes: &[u8]) -> Result<Self> {
        if bytes.starts_with(b"-----BEGIN") {
            let parsed = pem::parse(bytes)
                .map_err(|e| Error::Certificate(format!("invalid PEM: {}", e)))?;
            if parsed.tag() != "CERTIFICATE" {
                return Err(Error::Certificate(format!(
                    "expected a CERTIFICATE PEM block, found {}",
                    parsed.tag()
                )));
            }
            Self::from_der(parsed.contents())
        } else {
            Self::from_der(bytes)
        }
    }

    /// Load a certificate file
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(Error::at(path))?;
        Self::from_pem_or_der(&bytes).map_err(|e| match e {
            Error::Certificate(msg) => Error::Certificate(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Wrap an already-decoded certificate
    pub fn from_certificate(certificate: Certificate) -> Result<Self> {
        let der = certificate
            .to_der()
            .map_err(|e| Error::Certificate(format!("cannot encode certificate: {}", e)))?;
        Ok(Self { certificate, der })
    }

    /// The decoded certificate
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// DER encoding, the input to fingerprinting
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// PEM encoding
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new("CERTIFICATE", self.der.clone()))
    }

    /// Subject distinguished name, e.g. `CN=release signing`
    pub fn subject(&self) -> String {
        self.certificate.tbs_certificate.subject.to_string()
    }

    /// Fingerprint: `algorithm(DER(certificate))`
    pub fn fingerprint(&self, algorithm: HashAlgorithm) -> Hash {
        hash::hash_bytes(algorithm, &self.der)
    }

    /// Signature scheme of the subject public key
    pub fn scheme(&self) -> Option<SignatureScheme> {
        let spki = &self.certificate.tbs_certificate.subject_public_key_info;
        (spki.algorithm.oid == ID_ED25519).then_some(SignatureScheme::Ed25519)
    }

    /// The subject's Ed25519 public key
    pub fn ed25519_key(&self) -> Result<VerifyingKey> {
        let spki = &self.certificate.tbs_certificate.subject_public_key_info;
        if spki.algorithm.oid != ID_ED25519 {
            return Err(Error::Certificate(format!(
                "unsupported public key algorithm {}, only Ed25519 is supported",
                spki.algorithm.oid
            )));
        }

        let raw = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| Error::Certificate("public key bit string is not byte aligned".into()))?;
        let bytes: [u8; 32] = raw.try_into().map_err(|_| {
            Error::Certificate(format!("Ed25519 key must be 32 bytes, got {}", raw.len()))
        })?;

        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| Error::Certificate(format!("invalid Ed25519 public key: {}", e)))
    }

    /// Issue a self-signed certificate for `signing_key`
    ///
    /// Subject and issuer are both `CN=<common_name>`; the serial number is
    /// random and positive.
    pub fn self_signed(
        signing_key: &SigningKey,
        common_name: &str,
        validity: Duration,
    ) -> Result<Self> {
        let cert_err = |what: &str, e: &dyn std::fmt::Display| {
            Error::Certificate(format!("{}: {}", what, e))
        };

        let name = Name::from_str(&format!("CN={}", common_name))
            .map_err(|e| cert_err("invalid common name", &e))?;

        let mut serial = [0u8; 16];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut serial);
        serial[0] = (serial[0] & 0x7f) | 0x40;
        let serial_number =
            SerialNumber::new(&serial).map_err(|e| cert_err("serial number", &e))?;

        let algorithm = AlgorithmIdentifierOwned {
            oid: ID_ED25519,
            parameters: None,
        };

        let public_key = signing_key.verifying_key();
        let subject_public_key_info = SubjectPublicKeyInfoOwned {
            algorithm: algorithm.clone(),
            subject_public_key: BitString::from_bytes(public_key.as_bytes())
                .map_err(|e| cert_err("public key", &e))?,
        };

        let tbs_certificate = TbsCertificate {
            version: Version::V3,
            serial_number,
            signature: algorithm.clone(),
            issuer: name.clone(),
            validity: Validity::from_now(validity).map_err(|e| cert_err("validity", &e))?,
            subject: name,
            subject_public_key_info,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: None,
        };

        let tbs_der = tbs_certificate
            .to_der()
            .map_err(|e| cert_err("encoding certificate", &e))?;
        let signature = signing_key.sign(&tbs_der);

        let certificate = Certificate {
            tbs_certificate,
            signature_algorithm: algorithm,
            signature: BitString::from_bytes(&signature.to_bytes())
                .map_err(|e| cert_err("certificate signature", &e))?,
        };

        Self::from_certificate(certificate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Verifier;
    use rand::rngs::OsRng;
    use tempfile::TempDir;

    const ONE_YEAR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    #[test]
    fn test_self_signed_carries_key_and_name() {
        let key = SigningKey::generate(&mut OsRng);
        let cert = SignerCertificate::self_signed(&key, "release signing", ONE_YEAR).unwrap();

        assert_eq!(cert.subject(), "CN=release signing");
        assert_eq!(cert.scheme(), Some(SignatureScheme::Ed25519));
        assert_eq!(cert.ed25519_key().unwrap(), key.verifying_key());
    }

    #[test]
    fn test_self_signed_signature_verifies() {
        let key = SigningKey::generate(&mut OsRng);
        let cert = SignerCertificate::self_signed(&key, "test", ONE_YEAR).unwrap();

        let tbs = cert.certificate().tbs_certificate.to_der().unwrap();
        let sig_bytes = cert.certificate().signature.raw_bytes();
        let signature = ed25519_dalek::Signature::from_slice(sig_bytes).unwrap();
        key.verifying_key().verify(&tbs, &signature).unwrap();
    }

    #[test]
    fn test_pem_and_der_load_identically() {
        let key = SigningKey::generate(&mut OsRng);
        let cert = SignerCertificate::self_signed(&key, "test", ONE_YEAR).unwrap();

        let from_pem = SignerCertificate::from_pem_or_der(cert.to_pem().as_bytes()).unwrap();
        let from_der = SignerCertificate::from_pem_or_der(cert.der()).unwrap();
        assert_eq!(from_pem, cert);
        assert_eq!(from_der, cert);
    }

    #[test]
    fn test_fingerprint_is_digest_of_der() {
        let key = SigningKey::generate(&mut OsRng);
        let cert = SignerCertificate::self_signed(&key, "test", ONE_YEAR).unwrap();

        let fp = cert.fingerprint(HashAlgorithm::Sha256);
        assert_eq!(fp, hash::hash_bytes(HashAlgorithm::Sha256, cert.der()));
        assert_eq!(cert.fingerprint(HashAlgorithm::Sha512).as_bytes().len(), 64);
    }

    #[test]
    fn test_distinct_certificates_have_distinct_fingerprints() {
        let key = SigningKey::generate(&mut OsRng);
        let a = SignerCertificate::self_signed(&key, "test", ONE_YEAR).unwrap();
        let b = SignerCertificate::self_signed(&key, "test", ONE_YEAR).unwrap();
        // Random serial numbers make each issuance unique
        assert_ne!(
            a.fingerprint(HashAlgorithm::Sha256),
            b.fingerprint(HashAlgorithm::Sha256)
        );
    }

    #[test]
    fn test_rejects_non_certificate_pem() {
        let block = pem::encode(&pem::Pem::new("PRIVATE KEY", vec![1, 2, 3]));
        let err = SignerCertificate::from_pem_or_der(block.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Certificate(_)));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = SignerCertificate::from_pem_or_der(b"definitely not a certificate").unwrap_err();
        assert!(matches!(err, Error::Certificate(_)));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.pem");
        let err = SignerCertificate::load(&path).unwrap_err();
        assert!(matches!(err, Error::FileIo { .. }));
    }

    #[test]
    fn test_load_names_path_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.pem");
        fs::write(&path, b"definitely not a certificate").unwrap();

        let err = SignerCertificate::load(&path).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, Error::Certificate(_)));
        assert!(message.contains("bad.pem"));
        assert_eq!(message.matches("certificate error").count(), 1);
    }
}
