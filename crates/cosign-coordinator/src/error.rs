//! # Coordinator Errors
//!
//! Two tiers. [`DecodeError`] and [`IngestError`] belong to a single inbound
//! message: the ingestion loop logs them and moves on. [`CoordinatorError`]
//! is returned synchronously from caller-invoked actions (approve, export,
//! verify, start).

use cosign_core::error::CanonicalizationError;
use cosign_core::{AddressError, CryptoError, FileHash, Network, PartyKey};
use cosign_schema::SchemaValidationError;
use thiserror::Error;

use crate::transport::TransportError;

/// An inbound message could not be turned into a typed event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The transport could not decrypt the envelope.
    #[error("undecryptable message from {sender}: {reason}")]
    Undecryptable {
        /// Claimed sender of the envelope.
        sender: PartyKey,
        /// Transport diagnostic.
        reason: String,
    },

    /// The plaintext is not a well-formed message.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A field parsed but failed validation.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Wire name of the field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The same key appears twice across the client and arbitrator sets.
    #[error("duplicate party key {0}")]
    DuplicateKey(PartyKey),

    /// A contract-request asked for a quorum of zero.
    #[error("arbitratorsQuorum must be at least 1")]
    ZeroQuorum,
}

/// Failure to apply one inbound message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The message never decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The escrow address could not be derived; no record was created.
    #[error("contract {file_hash} rejected: {source}")]
    Address {
        /// Contract the request was for.
        file_hash: FileHash,
        /// Resolver failure.
        source: AddressError,
    },
}

/// Error from a caller-invoked coordinator action.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// No signing key is available for the contract's network.
    #[error("no signer for network {0}")]
    NoSigner(Network),

    /// The signing key for the network is not the identity approvals are
    /// sent as, so peers would record the signature under the wrong key.
    #[error("signer {signer} for network {network} is not the local identity {identity}")]
    SignerMismatch {
        /// Contract network.
        network: Network,
        /// Key the signer would sign with.
        signer: PartyKey,
        /// Identity the transport sends as.
        identity: PartyKey,
    },

    /// No contract-request for this hash has been ingested.
    #[error("unknown contract {0}")]
    UnknownContract(FileHash),

    /// Export was attempted before every listed party signed.
    #[error("contract {file_hash} is missing {} signature(s)", missing.len())]
    Incomplete {
        /// Contract being exported.
        file_hash: FileHash,
        /// Required signers without a signature, in order.
        missing: Vec<PartyKey>,
    },

    /// A recorded signature does not verify.
    #[error("signature by {signer} on {file_hash} does not verify: {source}")]
    InvalidSignature {
        /// Contract the signature is for.
        file_hash: FileHash,
        /// Claimed signer.
        signer: PartyKey,
        /// Verification failure.
        source: CryptoError,
    },

    /// The merged artifact failed export validation.
    #[error("export validation failed: {0}")]
    SchemaValidation(#[from] SchemaValidationError),

    /// The transport could not be subscribed to.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Canonical signable bytes could not be produced.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// JSON encoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing an export failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
