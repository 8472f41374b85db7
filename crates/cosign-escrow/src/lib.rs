//! # cosign-escrow: Escrow Address Resolution
//!
//! Deterministically derives the escrow address of a contract from its
//! network, its ordered client and arbitrator keys, and its arbitrator
//! quorum. The address is always computed locally; a counterparty's claim
//! about the escrow address is never trusted.
//!
//! - [`keys`]: x-only party keys → compressed secp256k1 keys (even-Y).
//! - [`script`]: the arbitrated multisig witness script.
//! - [`address`]: plain P2WSH or confidential Elements P2WSH addresses.
//!
//! ## Crate Policy
//!
//! - Key order is preserved exactly as received. Nothing here sorts.
//! - Every function is pure: same inputs, same address.

pub mod address;
pub mod keys;
pub mod script;

pub use address::{derive_escrow_address, AddressResolver, ScriptAddressResolver};
pub use keys::reconstruct_compressed;
pub use script::{EscrowPolicy, MAX_ESCROW_KEYS};
