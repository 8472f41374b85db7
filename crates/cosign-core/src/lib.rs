//! # cosign-core: Foundational Types for Contract Co-Signing
//!
//! Leaf crate of the workspace. Every other `cosign-*` crate depends on it;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Validated identifiers.** [`FileHash`] and [`PartyKey`] are newtypes
//!    with checked constructors. A bare string never reaches the store.
//!
//! 2. **`CanonicalBytes` newtype.** Everything that gets signed flows
//!    through [`CanonicalBytes::new()`], so two parties serializing the same
//!    [`ContractRecord`] always sign the same bytes.
//!
//! 3. **One contract model.** [`ContractRecord`] is built through
//!    [`ContractRecord::new()`], which keeps the denormalized key sets and the
//!    `document.fileHash` key in agreement.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cosign-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod contract;
pub mod error;
pub mod hex;
pub mod identity;
pub mod network;

pub use canonical::CanonicalBytes;
pub use contract::{
    Collateral, CollateralType, Communication, CommunicationType, ContractDocument,
    ContractRecord, PartyKeys, SignatureSet, CONTRACT_RECORD_VERSION, PLACEHOLDER_BLINDING_KEY,
};
pub use error::{AddressError, CosignError, CryptoError, ValidationError};
pub use identity::{FileHash, PartyKey};
pub use network::{ChainFamily, Network};
