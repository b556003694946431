// src/main.rs

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack {
            source,
            output,
            cert,
            key,
            algorithm,
        } => commands::cmd_pack(&source, &output, &cert, &key, algorithm),

        Commands::Unpack {
            archive,
            trust,
            dest,
            no_overwrite,
        } => commands::cmd_unpack(&archive, &trust, &dest, no_overwrite),

        Commands::Inspect { archive, trust } => commands::cmd_inspect(&archive, &trust),

        Commands::Keygen {
            output,
            common_name,
            days,
            force,
        } => commands::cmd_keygen(&output, &common_name, days, force),

        Commands::Fingerprint { cert, algorithm } => commands::cmd_fingerprint(&cert, algorithm),
    }
}
