//! # cosign CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cosign_cli::address::{run_address, AddressArgs};
use cosign_cli::document::{run_hash, HashArgs};
use cosign_cli::keys::{run_keygen, KeygenArgs};
use cosign_cli::verify::{run_verify, VerifyArgs};
use cosign_coordinator::CoordinatorConfig;

/// Contract co-signing toolkit.
///
/// Derives escrow addresses, hashes governed documents, generates party
/// keys, and verifies exported signed contracts.
#[derive(Parser, Debug)]
#[command(name = "cosign", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML coordinator configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive the escrow address for ordered key sets and a quorum.
    Address(AddressArgs),

    /// Hash a document, optionally checking it against a contract's hash.
    Hash(HashArgs),

    /// Generate a party key pair.
    Keygen(KeygenArgs),

    /// Verify an exported signed contract.
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Address(args) => run_address(&args),
        Commands::Hash(args) => run_hash(&args),
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Verify(args) => run_verify(&args, &config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<CoordinatorConfig> {
    let config = match path {
        Some(path) => CoordinatorConfig::from_file(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => CoordinatorConfig::default(),
    };
    let config = config
        .with_env_overrides()
        .context("invalid environment override")?;
    tracing::debug!(?config, "resolved configuration");
    Ok(config)
}
