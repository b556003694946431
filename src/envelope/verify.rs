// src/envelope/verify.rs

//! Envelope verification
//!
//! Three checks, strictly in this order, each with its own error:
//!
//! 1. the envelope decodes (`Parse`)
//! 2. the signature over the content verifies against the embedded
//!    certificate's key (`SignatureInvalid`)
//! 3. the trust policy accepts that certificate (`CertificateNotTrusted`)
//!
//! A forged envelope therefore never reaches the trust check, and a
//! correctly signed envelope from an unknown signer never yields content.

use super::{SignatureScheme, SignedEnvelope, SignerCertificate, TrustPolicy};
use crate::error::{Error, Result};
use ed25519_dalek::Signature;
use tracing::debug;

/// Content released by a successful verification
#[derive(Debug, Clone)]
pub struct VerifiedContent {
    /// The unsigned blob
    pub blob: Vec<u8>,
    /// The certificate that signed it
    pub signer: SignerCertificate,
}

/// Verify an encoded envelope and return its content
pub fn open(envelope_der: &[u8], policy: &dyn TrustPolicy) -> Result<VerifiedContent> {
    let envelope = SignedEnvelope::from_der(envelope_der)?;

    verify_signature(&envelope)?;
    debug!("Envelope signature valid, signer {}", envelope.certificate.subject());

    policy.check(&envelope.certificate)?;

    Ok(VerifiedContent {
        blob: envelope.content,
        signer: envelope.certificate,
    })
}

/// Check the envelope signature against its embedded certificate
pub fn verify_signature(envelope: &SignedEnvelope) -> Result<()> {
    match envelope.scheme {
        SignatureScheme::Ed25519 => {
            let key = envelope
                .certificate
                .ed25519_key()
                .map_err(|e| Error::SignatureInvalid(e.to_string()))?;
            let signature = Signature::from_slice(&envelope.signature)
                .map_err(|e| Error::SignatureInvalid(format!("malformed signature: {}", e)))?;

            key.verify_strict(&envelope.content, &signature)
                .map_err(|e| Error::SignatureInvalid(e.to_string()))
        }
    }
}
