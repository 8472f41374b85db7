//! # cosign-crypto: Cryptographic Primitives
//!
//! - **Schnorr** (BIP-340) signing and verification over
//!   [`CanonicalBytes`](cosign_core::CanonicalBytes). Party keys are x-only
//!   secp256k1 keys, so every approval can be checked against the
//!   [`PartyKey`](cosign_core::PartyKey) that sent it.
//! - **Keyring**, the local signing service: one key pair per chain family.
//! - **SHA-256 document hashing** for the local document-match check.
//!
//! ## Crate Policy
//!
//! - Depends only on `cosign-core` internally.
//! - Tests use real keys and real signatures, no mocks.
//! - Private keys are never serialized and never appear in `Debug` output.

pub mod schnorr;
pub mod sha256;
pub mod signer;

pub use schnorr::{verify_contract_signature, SchnorrKeyPair, SchnorrSignature};
pub use sha256::{hash_document, hash_file};
pub use signer::{ContractSigner, KeyLoadError, Keyring, SignerError, SIGNING_KEY_ENV};
