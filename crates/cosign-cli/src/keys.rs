//! # Keygen Subcommand
//!
//! Generates a BIP-340 key pair. The secret goes to `<prefix>.key` and the
//! x-only party key to `<prefix>.pub`, both as lowercase hex. Load the
//! secret into a coordinator through `COSIGN_SIGNING_KEY_HEX`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use cosign_crypto::{SchnorrKeyPair, SIGNING_KEY_ENV};

/// Arguments for `cosign keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for the key files.
    #[arg(long, short)]
    pub output: PathBuf,

    /// File name prefix (produces `<prefix>.key` and `<prefix>.pub`).
    #[arg(long, default_value = "cosign")]
    pub prefix: String,
}

/// Execute `cosign keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    cmd_keygen(&args.output, &args.prefix)
}

/// Generate a key pair and write it under `output_dir`.
pub fn cmd_keygen(output_dir: &Path, prefix: &str) -> Result<u8> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    let keypair = SchnorrKeyPair::generate();
    let party_key = keypair.party_key();

    let sk_path = output_dir.join(format!("{prefix}.key"));
    let pk_path = output_dir.join(format!("{prefix}.pub"));

    std::fs::write(&sk_path, keypair.secret_hex().as_bytes())
        .with_context(|| format!("failed to write private key: {}", sk_path.display()))?;
    std::fs::write(&pk_path, party_key.as_str())
        .with_context(|| format!("failed to write party key: {}", pk_path.display()))?;

    println!("OK: generated Schnorr keypair");
    println!("  Private key: {}", sk_path.display());
    println!("  Party key:   {}", pk_path.display());
    println!("  Party key (hex): {party_key}");
    println!("  Sign with: {SIGNING_KEY_ENV}=$(cat {})", sk_path.display());

    Ok(0)
}
