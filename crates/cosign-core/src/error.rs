//! # Error Types
//!
//! Structured error hierarchy shared by the co-signing crates. All errors
//! derive `thiserror::Error`.
//!
//! - Address derivation errors name the offending key or network.
//! - Crypto errors carry the parse or verification failure verbatim.
//! - Per-message and per-contract errors are values, never panics; the
//!   ingestion loop logs and drops them.

use thiserror::Error;

/// Top-level error type for the core crates.
#[derive(Error, Debug)]
pub enum CosignError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// An identifier or hex string failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Escrow address derivation failed.
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values cannot be canonicalized deterministically.
    #[error("float values are not permitted in signable data: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A string failed identifier validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The value was empty.
    #[error("{kind} must not be empty")]
    Empty {
        /// Which identifier kind was being parsed.
        kind: &'static str,
    },

    /// The value contained a non-hex character.
    #[error("{kind} must be hex-encoded, found {found:?} at position {position}")]
    NotHex {
        /// Which identifier kind was being parsed.
        kind: &'static str,
        /// The offending character.
        found: char,
        /// Byte position of the offending character.
        position: usize,
    },

    /// The value had the wrong length.
    #[error("{kind} must be {expected} hex chars, got {actual}")]
    InvalidLength {
        /// Which identifier kind was being parsed.
        kind: &'static str,
        /// Required length in hex characters.
        expected: usize,
        /// Actual length in hex characters.
        actual: usize,
    },

    /// Hex strings must encode whole bytes.
    #[error("{kind} has odd hex length {actual}")]
    OddLength {
        /// Which identifier kind was being parsed.
        kind: &'static str,
        /// Actual length in hex characters.
        actual: usize,
    },
}

/// Error in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Signature bytes could not be parsed.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
}

/// Error while deriving an escrow address.
///
/// Any of these is fatal to the single contract-request being processed;
/// the record is simply not created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A party key could not be turned into a valid compressed public key.
    #[error("invalid key material for {key}: {reason}")]
    InvalidKeyMaterial {
        /// The key as received.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The network string does not map to a supported chain family.
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// Quorum or key-set sizes do not form a valid escrow script.
    #[error("invalid quorum {quorum} for {clients} client(s) and {arbitrators} arbitrator(s)")]
    InvalidQuorum {
        /// Requested arbitrator quorum.
        quorum: u32,
        /// Number of client keys.
        clients: usize,
        /// Number of arbitrator keys.
        arbitrators: usize,
    },
}
