//! # cosign-cli: Contract Co-Signing Command-Line Interface
//!
//! ## Subcommands
//!
//! - `address`: derive an escrow address from ordered keys and a quorum
//! - `hash`: SHA-256 a document and optionally gate on a contract hash
//! - `keygen`: generate a party key pair
//! - `verify`: schema-check and signature-check an exported contract
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; every decision is made by a domain crate.
//! - Handlers return an exit code: `0` success, `1` failed check. Errors
//!   that stop a command from running propagate as `anyhow::Error`.

pub mod address;
pub mod document;
pub mod keys;
pub mod verify;
