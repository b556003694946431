// src/envelope/mod.rs

//! Signed envelope
//!
//! The unsigned blob travels inside a DER-encoded CMS `ContentInfo`
//! (RFC 5652) of type `id-signedData`:
//!
//! - the blob is the encapsulated `id-data` content
//! - the signer's leaf certificate is embedded in `certificates`
//! - a single `SignerInfo`, identified by issuer and serial number, carries
//!   an Ed25519 signature over the blob bytes (RFC 8419, no signed
//!   attributes)
//!
//! [`SignedEnvelope`] handles the encoding only. Signing lives in
//! [`signing`], verification and trust decisions in [`verify`] and
//! [`trust`].

mod certificate;
pub mod signing;
pub mod trust;
pub mod verify;

pub use certificate::SignerCertificate;
pub use signing::SignerIdentity;
pub use trust::{FingerprintSet, PinnedFingerprint, TrustPolicy};
pub use verify::{open, VerifiedContent};

use crate::error::{Error, Result};
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo, SignerInfos,
};
use const_oid::ObjectIdentifier;
use x509_cert::der::asn1::{OctetString, SetOfVec};
use x509_cert::der::{Any, Decode, Encode, Tag, Tagged};
use x509_cert::spki::AlgorithmIdentifierOwned;

/// id-signedData
pub const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
/// id-data
pub const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
/// id-sha512, the digest algorithm RFC 8419 pairs with Ed25519
pub const ID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");
/// id-Ed25519
pub const ID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

/// Signature schemes an envelope can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Ed25519,
}

impl std::fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "ed25519"),
        }
    }
}

/// Decoded contents of a signed envelope, before any verification
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    /// Encapsulated content (the unsigned blob)
    pub content: Vec<u8>,
    /// Signer's leaf certificate
    pub certificate: SignerCertificate,
    /// Signature scheme named by the SignerInfo
    pub scheme: SignatureScheme,
    /// Raw signature bytes
    pub signature: Vec<u8>,
}

fn der_error(context: &'static str) -> impl Fn(x509_cert::der::Error) -> Error {
    move |e| Error::Parse(format!("{}: {}", context, e))
}

impl SignedEnvelope {
    /// Encode as a DER `ContentInfo`
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let encode = |e: x509_cert::der::Error| Error::Signing(format!("encoding envelope: {}", e));

        let cert = self.certificate.certificate().clone();
        let sid = SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
            issuer: cert.tbs_certificate.issuer.clone(),
            serial_number: cert.tbs_certificate.serial_number.clone(),
        });

        let digest_alg = AlgorithmIdentifierOwned {
            oid: ID_SHA512,
            parameters: None,
        };

        let signer_info = SignerInfo {
            version: CmsVersion::V1,
            sid,
            digest_alg: digest_alg.clone(),
            signed_attrs: None,
            signature_algorithm: AlgorithmIdentifierOwned {
                oid: ID_ED25519,
                parameters: None,
            },
            signature: OctetString::new(self.signature.clone()).map_err(encode)?,
            unsigned_attrs: None,
        };

        let signed_data = SignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![digest_alg]).map_err(encode)?,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: ID_DATA,
                econtent: Some(Any::new(Tag::OctetString, self.content.clone()).map_err(encode)?),
            },
            certificates: Some(CertificateSet(
                SetOfVec::try_from(vec![CertificateChoices::Certificate(cert)]).map_err(encode)?,
            )),
            crls: None,
            signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info]).map_err(encode)?),
        };

        let content_info = ContentInfo {
            content_type: ID_SIGNED_DATA,
            content: Any::encode_from(&signed_data).map_err(encode)?,
        };

        content_info.to_der().map_err(encode)
    }

    /// Decode a DER `ContentInfo`
    ///
    /// Every structural problem is a `Parse` error: wrong content types, a
    /// missing certificate, anything other than exactly one signer, signed
    /// attributes, or a signature algorithm other than Ed25519.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let content_info = ContentInfo::from_der(bytes).map_err(der_error("ContentInfo"))?;
        if content_info.content_type != ID_SIGNED_DATA {
            return Err(Error::Parse(format!(
                "content type {} is not signed-data",
                content_info.content_type
            )));
        }

        let signed_der = content_info.content.to_der().map_err(der_error("SignedData"))?;
        let signed_data = SignedData::from_der(&signed_der).map_err(der_error("SignedData"))?;

        let content = encapsulated_content(&signed_data.encap_content_info)?;

        let mut signers = signed_data.signer_infos.0.iter();
        let signer = match (signers.next(), signers.next()) {
            (Some(signer), None) => signer,
            (None, _) => return Err(Error::Parse("envelope has no signer".into())),
            (Some(_), Some(_)) => {
                return Err(Error::Parse(format!(
                    "envelope has {} signers, expected 1",
                    signed_data.signer_infos.0.len()
                )));
            }
        };

        if signer.signed_attrs.is_some() {
            return Err(Error::Parse("signed attributes are not supported".into()));
        }
        if signer.signature_algorithm.oid != ID_ED25519 {
            return Err(Error::Parse(format!(
                "unsupported signature algorithm {}",
                signer.signature_algorithm.oid
            )));
        }

        let certificate = signer_certificate(&signed_data, &signer.sid)?;

        Ok(Self {
            content,
            certificate,
            scheme: SignatureScheme::Ed25519,
            signature: signer.signature.as_bytes().to_vec(),
        })
    }
}

fn encapsulated_content(encap: &EncapsulatedContentInfo) -> Result<Vec<u8>> {
    if encap.econtent_type != ID_DATA {
        return Err(Error::Parse(format!(
            "encapsulated content type {} is not data",
            encap.econtent_type
        )));
    }

    let econtent = encap
        .econtent
        .as_ref()
        .ok_or_else(|| Error::Parse("envelope is detached, content missing".into()))?;
    if econtent.tag() != Tag::OctetString {
        return Err(Error::Parse(format!(
            "encapsulated content is {}, expected OCTET STRING",
            econtent.tag()
        )));
    }

    Ok(econtent.value().to_vec())
}

/// Find the embedded certificate the signer identifier points at
fn signer_certificate(
    signed_data: &SignedData,
    sid: &SignerIdentifier,
) -> Result<SignerCertificate> {
    let SignerIdentifier::IssuerAndSerialNumber(id) = sid else {
        return Err(Error::Parse(
            "signer must be identified by issuer and serial number".into(),
        ));
    };

    let certificates = signed_data
        .certificates
        .as_ref()
        .ok_or_else(|| Error::Parse("envelope carries no certificates".into()))?;

    let found = certificates.0.iter().find_map(|choice| match choice {
        CertificateChoices::Certificate(cert)
            if cert.tbs_certificate.issuer == id.issuer
                && cert.tbs_certificate.serial_number == id.serial_number =>
        {
            Some(cert.clone())
        }
        _ => None,
    });

    let cert = found.ok_or_else(|| {
        Error::Parse(format!(
            "no embedded certificate matches signer {} serial {}",
            id.issuer,
            hex::encode(id.serial_number.as_bytes())
        ))
    })?;

    SignerCertificate::from_certificate(cert).map_err(|e| Error::Parse(e.to_string()))
}
