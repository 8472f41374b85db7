//! # cosign-coordinator: Contract Co-Signing Coordinator
//!
//! The state machine that lets clients and arbitrators agree on a contract
//! over an encrypted relay:
//!
//! 1. A **contract-request** arrives. [`EventIngestor`] derives the escrow
//!    address locally and stores a [`ContractRecord`](cosign_core::ContractRecord).
//! 2. Each party checks its copy of the document against the contract's
//!    hash and calls [`ApprovalController::approve`], which signs the
//!    record's canonical bytes and sends a **contract-approval** to every
//!    listed party.
//! 3. Approvals land in the [`ContractStore`] in any order, before or after
//!    the request.
//! 4. Once every listed party has signed, [`CompletionEngine`] exports the
//!    record and its signatures as one schema-validated artifact.
//!
//! [`CoordinatorService`] wires these together for one identity, with an
//! explicit `start()`/`stop()` lifecycle.
//!
//! ## Crate Policy
//!
//! - The relay is reached only through [`EncryptedTransport`].
//! - Per-message errors are logged and dropped; they never end ingestion.
//! - Store locks are never held across `.await`.

pub mod approval;
pub mod completion;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod memory;
pub mod messages;
pub mod service;
pub mod store;
pub mod transport;

pub use approval::{signable_data, ApprovalController, ApprovalReport};
pub use completion::{export_file_name, CompletionEngine, ExportValidator, SignedContract};
pub use config::{ConfigError, CoordinatorConfig};
pub use error::{CoordinatorError, DecodeError, IngestError};
pub use ingestion::{EventIngestor, IngestOutcome};
pub use memory::{MemoryRelay, MemoryTransport};
pub use messages::{ContractApproval, ContractRequest, Inbound, MessageKind, WireMessage};
pub use service::CoordinatorService;
pub use store::{ContractStore, StoreEvent};
pub use transport::{
    EncryptedTransport, Envelope, Subscription, SubscriptionFilter, TransportError,
};
