// src/cli/mod.rs
//! CLI definitions for sealpack
//!
//! This module contains the command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use sealpack::HashAlgorithm;

#[derive(Parser)]
#[command(name = "sealpack")]
#[command(version)]
#[command(about = "Signed, tamper-evident directory archives", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Which signer certificates to accept
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct TrustArgs {
    /// Fingerprint of the trusted signer certificate
    /// (hex, optionally `sha256:`/`sha512:` prefixed or colon-separated)
    #[arg(long)]
    pub fingerprint: Option<String>,

    /// TOML file listing trusted fingerprints
    #[arg(long)]
    pub trust: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pack a directory into a signed archive
    Pack {
        /// Directory to pack
        source: String,

        /// Archive to write
        #[arg(short, long)]
        output: String,

        /// Signer certificate (PEM or DER)
        #[arg(long)]
        cert: String,

        /// Signer private key (PKCS#8 PEM)
        #[arg(long)]
        key: String,

        /// Digest algorithm for file contents: sha256, sha512
        #[arg(long, default_value = "sha256")]
        algorithm: HashAlgorithm,
    },

    /// Verify a signed archive and extract it
    Unpack {
        /// Archive to unpack
        archive: String,

        #[command(flatten)]
        trust: TrustArgs,

        /// Destination directory
        #[arg(short, long, default_value = ".")]
        dest: String,

        /// Fail instead of replacing files that already exist
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Verify a signed archive and list its contents without extracting
    Inspect {
        /// Archive to inspect
        archive: String,

        #[command(flatten)]
        trust: TrustArgs,
    },

    /// Generate an Ed25519 key and a self-signed certificate
    Keygen {
        /// Output prefix; writes <PREFIX>.crt and <PREFIX>.key
        #[arg(short, long, default_value = "sealpack")]
        output: String,

        /// Certificate subject common name
        #[arg(long, default_value = "sealpack signer")]
        common_name: String,

        /// Certificate validity in days
        #[arg(long, default_value_t = 365)]
        days: u32,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Print the fingerprint of a certificate, for pinning
    Fingerprint {
        /// Certificate file (PEM or DER)
        cert: String,

        /// Fingerprint algorithm: sha256, sha512
        #[arg(long, default_value = "sha256")]
        algorithm: HashAlgorithm,
    },
}
