// src/commands/unpack.rs
//! Unpack command

use super::{format_bytes, resolve_trust};
use crate::cli::TrustArgs;
use anyhow::{Context, Result};
use sealpack::UnpackOptions;
use std::path::Path;

/// Verify a signed archive and extract it into `dest`
pub fn cmd_unpack(archive: &str, trust: &TrustArgs, dest: &str, no_overwrite: bool) -> Result<()> {
    let policy = resolve_trust(trust)?;
    let options = UnpackOptions {
        overwrite: !no_overwrite,
    };

    let report = sealpack::unpack(Path::new(archive), policy.as_ref(), Path::new(dest), &options)
        .with_context(|| format!("Failed to unpack {}", archive))?;

    println!("Verified signature from {}", report.signer);
    println!(
        "Extracted {} files ({}) to {}",
        report.extraction.files.len(),
        format_bytes(report.extraction.bytes),
        dest
    );

    Ok(())
}
