// src/commands/keygen.rs
//! Signer key generation

use anyhow::{Context, Result};
use sealpack::{HashAlgorithm, SignerIdentity};
use std::path::PathBuf;

/// Generate an Ed25519 key and a self-signed certificate
pub fn cmd_keygen(output: &str, common_name: &str, days: u32, force: bool) -> Result<()> {
    let cert_path = PathBuf::from(format!("{}.crt", output));
    let key_path = PathBuf::from(format!("{}.key", output));

    if !force && (cert_path.exists() || key_path.exists()) {
        anyhow::bail!(
            "Signer files already exist. Use --force to overwrite.\n  Certificate: {}\n  Private key: {}",
            cert_path.display(),
            key_path.display()
        );
    }

    if days == 0 {
        anyhow::bail!("Certificate validity must be at least one day");
    }

    println!("Generating Ed25519 signer for CN={}...", common_name);

    let identity = SignerIdentity::generate(common_name, days)
        .context("Failed to generate signer identity")?;
    identity
        .save(&cert_path, &key_path)
        .context("Failed to save signer files")?;

    println!();
    println!("Files created:");
    println!("  Certificate: {}", cert_path.display());
    println!("  Private key: {} (keep this secret!)", key_path.display());
    println!();
    println!("Certificate fingerprint:");
    println!("  {}", identity.fingerprint(HashAlgorithm::Sha256).to_prefixed_string());
    println!();
    println!("To pack a directory:");
    println!(
        "  sealpack pack <DIR> -o <ARCHIVE> --cert {} --key {}",
        cert_path.display(),
        key_path.display()
    );

    Ok(())
}
