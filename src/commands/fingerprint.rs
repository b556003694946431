// src/commands/fingerprint.rs
//! Certificate fingerprint command

use anyhow::{Context, Result};
use sealpack::{HashAlgorithm, SignerCertificate};
use std::path::Path;

/// Print the fingerprint of a certificate file
pub fn cmd_fingerprint(cert: &str, algorithm: HashAlgorithm) -> Result<()> {
    let certificate = SignerCertificate::load(Path::new(cert))
        .with_context(|| format!("Failed to load certificate: {}", cert))?;

    println!("{}", certificate.fingerprint(algorithm).to_prefixed_string());
    Ok(())
}
