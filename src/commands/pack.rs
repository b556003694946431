// src/commands/pack.rs
//! Pack command

use super::format_bytes;
use anyhow::{Context, Result};
use sealpack::{HashAlgorithm, PackOptions, SourceSet};
use std::path::Path;
use tracing::info;

/// Pack a directory into a signed archive
pub fn cmd_pack(
    source: &str,
    output: &str,
    cert: &str,
    key: &str,
    algorithm: HashAlgorithm,
) -> Result<()> {
    let source_dir = Path::new(source);
    if !source_dir.is_dir() {
        anyhow::bail!("Source is not a directory: {}", source);
    }

    info!("Collecting files under {}", source_dir.display());
    let sources = SourceSet::from_dir(source_dir)
        .with_context(|| format!("Failed to collect files from {}", source))?;

    let options = PackOptions { algorithm };
    let report = sealpack::pack(
        &sources,
        Path::new(output),
        Path::new(cert),
        Path::new(key),
        &options,
    )
    .with_context(|| format!("Failed to pack {}", source))?;

    println!(
        "Packed {} files ({}) into {}",
        report.files,
        format_bytes(report.bytes),
        report.output.display()
    );
    println!("  Archive size: {}", format_bytes(report.archive_size));
    println!("  Digest:       {}", algorithm);
    println!("  Signer:       {}", report.signer);
    println!("  Fingerprint:  {}", report.fingerprint.to_prefixed_string());
    println!();
    println!("To unpack:");
    println!(
        "  sealpack unpack {} --fingerprint {}",
        report.output.display(),
        report.fingerprint.to_prefixed_string()
    );

    Ok(())
}
