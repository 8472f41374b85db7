//! # Verify Subcommand
//!
//! Checks an exported signed contract end to end:
//!
//! 1. The file validates against the signed-contract schema.
//! 2. The denormalized key sets agree.
//! 3. The escrow address is the one derived from the keys and quorum.
//! 4. Every listed client and arbitrator has signed.
//! 5. Every signature verifies over the record's canonical bytes.
//!
//! Prints `OK:` and exits 0 when all pass; otherwise prints each failure
//! as `FAIL:` and exits 1.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use cosign_coordinator::{CoordinatorConfig, SignedContract};
use cosign_escrow::derive_escrow_address;
use cosign_schema::SchemaValidator;

/// Arguments for `cosign verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Exported contract JSON.
    pub file: PathBuf,

    /// Directory of `*.schema.json` files. Overrides the configured one.
    #[arg(long)]
    pub schema_dir: Option<PathBuf>,
}

/// Execute `cosign verify`.
pub fn run_verify(args: &VerifyArgs, config: &CoordinatorConfig) -> Result<u8> {
    let validator = match args.schema_dir.as_ref().or(config.schema_dir.as_ref()) {
        Some(dir) => SchemaValidator::new(dir)
            .with_context(|| format!("failed to load schemas from {}", dir.display()))?,
        None => SchemaValidator::builtin().context("failed to load built-in schema")?,
    };
    let failures = cmd_verify(&validator, &args.file)?;
    if failures.is_empty() {
        println!("OK: {} is a complete, valid signed contract", args.file.display());
        return Ok(0);
    }
    for failure in &failures {
        println!("FAIL: {failure}");
    }
    Ok(1)
}

/// Run every check on `path` and return the failures.
///
/// Errors only when the file cannot be read or is not JSON.
pub fn cmd_verify(validator: &SchemaValidator, path: &Path) -> Result<Vec<String>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    if let Err(e) = validator.validate_signed_contract(&value) {
        return Ok(match e.violations() {
            Some(violations) => violations
                .iter()
                .map(|v| format!("schema: {}", v.to_string().trim_start()))
                .collect(),
            None => vec![format!("schema: {e}")],
        });
    }

    let signed: SignedContract = match serde_json::from_value(value) {
        Ok(signed) => signed,
        Err(e) => return Ok(vec![format!("contract: {e}")]),
    };
    Ok(check_contract(&signed))
}

fn check_contract(signed: &SignedContract) -> Vec<String> {
    let record = &signed.record;
    let mut failures = Vec::new();

    if !record.is_consistent() {
        failures.push("contract: collateral, communication and document key sets differ".to_string());
    }

    let parties = &record.collateral.pubkeys;
    match derive_escrow_address(
        record.network(),
        &parties.clients,
        &parties.arbitrators,
        record.collateral.arbitrators_quorum,
    ) {
        Ok(address) if address == record.collateral.multisig_address => {}
        Ok(address) => failures.push(format!(
            "escrow: address {} does not match derived {address}",
            record.collateral.multisig_address
        )),
        Err(e) => failures.push(format!("escrow: {e}")),
    }

    for key in record.required_signers() {
        if !signed.signatures.contains_key(&key) {
            failures.push(format!("signatures: missing signature from {key}"));
        }
    }

    if let Err(e) = signed.verify() {
        failures.push(format!("signatures: {e}"));
    }

    tracing::debug!(
        file_hash = %record.file_hash(),
        failures = failures.len(),
        "verified signed contract"
    );
    failures
}
