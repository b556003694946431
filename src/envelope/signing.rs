// src/envelope/signing.rs

//! Envelope signing
//!
//! A [`SignerIdentity`] pairs an X.509 certificate with the Ed25519 private
//! key it certifies. Identities can be generated, saved as PEM, loaded back,
//! and used to seal blobs into signed envelopes.

use super::{SignatureScheme, SignedEnvelope, SignerCertificate};
use crate::error::{Error, Result};
use crate::hash::{Hash, HashAlgorithm};
use ed25519_dalek::{Signer, SigningKey};
use pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rand::rngs::OsRng;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// A certificate and its matching private key
pub struct SignerIdentity {
    certificate: SignerCertificate,
    signing_key: SigningKey,
}

impl std::fmt::Debug for SignerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerIdentity")
            .field("subject", &self.certificate.subject())
            .finish_non_exhaustive()
    }
}

impl SignerIdentity {
    /// Pair a certificate with a private key
    ///
    /// Fails with `KeyMismatch` if the key is not the one the certificate
    /// certifies, and with `Certificate` if the certificate key is not
    /// Ed25519.
    pub fn new(certificate: SignerCertificate, signing_key: SigningKey) -> Result<Self> {
        let certified = certificate.ed25519_key()?;
        let actual = signing_key.verifying_key();

        if certified != actual {
            return Err(Error::KeyMismatch {
                certificate: hex::encode(certified.as_bytes()),
                key: hex::encode(actual.as_bytes()),
            });
        }

        Ok(Self {
            certificate,
            signing_key,
        })
    }

    /// Create a fresh key pair and a self-signed certificate for it
    pub fn generate(common_name: &str, validity_days: u32) -> Result<Self> {
        let signing_key = SigningKey::generate(&mut OsRng);
        let validity = Duration::from_secs(u64::from(validity_days) * SECONDS_PER_DAY);
        let certificate = SignerCertificate::self_signed(&signing_key, common_name, validity)?;
        Self::new(certificate, signing_key)
    }

    /// Load a certificate (PEM or DER) and a PKCS#8 private key (PEM or DER)
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let certificate = SignerCertificate::load(cert_path)?;

        let key_bytes = fs::read(key_path).map_err(Error::at(key_path))?;
        let signing_key = parse_private_key(&key_bytes)
            .map_err(|e| Error::Signing(format!("{}: {}", key_path.display(), e)))?;

        debug!("Loaded signer {} from {}", certificate.subject(), cert_path.display());
        Self::new(certificate, signing_key)
    }

    /// Write the certificate as PEM and the private key as PKCS#8 PEM
    ///
    /// The key file is created with mode 0600 on Unix. Existing files are
    /// replaced.
    pub fn save(&self, cert_path: &Path, key_path: &Path) -> Result<()> {
        fs::write(cert_path, self.certificate.to_pem()).map_err(Error::at(cert_path))?;

        let key_pem = self
            .signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| Error::Signing(format!("encoding private key: {}", e)))?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(key_path).map_err(Error::at(key_path))?;
        file.write_all(key_pem.as_bytes()).map_err(Error::at(key_path))?;

        // `mode` only applies on creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(key_path, fs::Permissions::from_mode(0o600))
                .map_err(Error::at(key_path))?;
        }

        info!(
            "Saved signer {} to {} and {}",
            self.certificate.subject(),
            cert_path.display(),
            key_path.display()
        );
        Ok(())
    }

    /// The signer's certificate
    pub fn certificate(&self) -> &SignerCertificate {
        &self.certificate
    }

    /// Fingerprint of the signer's certificate
    pub fn fingerprint(&self, algorithm: HashAlgorithm) -> Hash {
        self.certificate.fingerprint(algorithm)
    }

    /// Sign `blob` and wrap it in a DER-encoded envelope
    pub fn seal(&self, blob: &[u8]) -> Result<Vec<u8>> {
        let signature = self
            .signing_key
            .try_sign(blob)
            .map_err(|e| Error::Signing(e.to_string()))?;

        let envelope = SignedEnvelope {
            content: blob.to_vec(),
            certificate: self.certificate.clone(),
            scheme: SignatureScheme::Ed25519,
            signature: signature.to_bytes().to_vec(),
        };
        envelope.to_der()
    }
}

fn parse_private_key(bytes: &[u8]) -> std::result::Result<SigningKey, pkcs8::Error> {
    match std::str::from_utf8(bytes) {
        Ok(text) if text.trim_start().starts_with("-----BEGIN") => SigningKey::from_pkcs8_pem(text),
        _ => SigningKey::from_pkcs8_der(bytes),
    }
}
