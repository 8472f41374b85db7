//! # Hash Subcommand
//!
//! Prints the SHA-256 file hash of a document. With `--expect`, compares it
//! to the hash a contract request names and fails on mismatch. This is the
//! check every party makes before approving.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use cosign_core::FileHash;
use cosign_crypto::hash_file;

/// Arguments for `cosign hash`.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Document to hash.
    pub file: PathBuf,

    /// File hash from the contract request.
    #[arg(long)]
    pub expect: Option<FileHash>,
}

/// Execute `cosign hash`.
pub fn run_hash(args: &HashArgs) -> Result<u8> {
    let actual = cmd_hash(&args.file)?;
    let Some(expected) = &args.expect else {
        println!("{actual}");
        return Ok(0);
    };
    if &actual == expected {
        println!("OK: {} matches {expected}", args.file.display());
        Ok(0)
    } else {
        println!(
            "FAIL: {} hashes to {actual}, contract names {expected}",
            args.file.display()
        );
        Ok(1)
    }
}

/// Hash one document.
pub fn cmd_hash(path: &Path) -> Result<FileHash> {
    let hash = hash_file(path).with_context(|| format!("cannot read {}", path.display()))?;
    tracing::debug!(path = %path.display(), %hash, "hashed document");
    Ok(hash)
}
