// src/commands/inspect.rs
//! Inspect command

use super::{format_bytes, resolve_trust};
use crate::cli::TrustArgs;
use anyhow::{Context, Result};
use sealpack::HashAlgorithm;
use std::path::Path;

/// Verify a signed archive and print its manifest
pub fn cmd_inspect(archive: &str, trust: &TrustArgs) -> Result<()> {
    let policy = resolve_trust(trust)?;

    let inspection = sealpack::inspect(Path::new(archive), policy.as_ref())
        .with_context(|| format!("Failed to inspect {}", archive))?;
    let manifest = &inspection.manifest;

    println!("Archive: {}", archive);
    println!("  Size:        {}", format_bytes(inspection.archive_size));
    println!("  Signer:      {}", inspection.signer.subject());
    println!(
        "  Fingerprint: {}",
        inspection.signer.fingerprint(HashAlgorithm::Sha256).to_prefixed_string()
    );
    println!("  Digest:      {}", manifest.algorithm);
    println!("  Files:       {} ({})", manifest.len(), format_bytes(manifest.total_size()));
    println!();

    for (path, record) in &manifest.files {
        println!(
            "  {:>10}  {}  {}",
            record.size,
            record.modified_at.format("%Y-%m-%d %H:%M:%S"),
            path
        );
    }

    Ok(())
}
