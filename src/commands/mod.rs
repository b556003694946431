// src/commands/mod.rs
//! Command handlers for the sealpack CLI

mod fingerprint;
mod inspect;
mod keygen;
mod pack;
mod unpack;

pub use fingerprint::cmd_fingerprint;
pub use inspect::cmd_inspect;
pub use keygen::cmd_keygen;
pub use pack::cmd_pack;
pub use unpack::cmd_unpack;

use crate::cli::TrustArgs;
use anyhow::{Context, Result};
use sealpack::{PinnedFingerprint, TrustConfig, TrustPolicy};
use std::path::Path;

/// Build the trust policy selected on the command line
///
/// Fingerprints and trust files are parsed before any archive is read.
pub(crate) fn resolve_trust(args: &TrustArgs) -> Result<Box<dyn TrustPolicy>> {
    match (&args.fingerprint, &args.trust) {
        (Some(fingerprint), _) => {
            let pin = PinnedFingerprint::parse(fingerprint)
                .with_context(|| format!("Invalid fingerprint: {}", fingerprint))?;
            Ok(Box::new(pin))
        }
        (None, Some(path)) => {
            let config = TrustConfig::from_file(Path::new(path))
                .with_context(|| format!("Failed to load trust file: {}", path))?;
            Ok(Box::new(config.policy()))
        }
        (None, None) => anyhow::bail!("Either --fingerprint or --trust is required"),
    }
}

/// Format a byte count for display
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
