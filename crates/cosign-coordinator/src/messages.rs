//! # Wire Messages
//!
//! Two direct-message kinds travel between parties, as JSON:
//!
//! ```text
//! {"kind": "contract-request",  "payload": {fileHash, arbitratorsQuorum,
//!                                           arbitratorPubkeys, clientPubkeys, network}}
//! {"kind": "contract-approval", "payload": {signature, fileHash}}
//! ```
//!
//! Decoding is two-stage: serde checks the shape, then [`decode`] validates
//! every field into typed values. Unknown fields are ignored, which includes
//! any `multisigAddress` a sender volunteers; the escrow address is always
//! derived locally.

use cosign_core::{hex, AddressError, FileHash, Network, PartyKey, PartyKeys};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Raw contract-request payload as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRequestPayload {
    /// Content hash of the governed document.
    pub file_hash: String,
    /// Arbitrator signatures needed on the dispute path.
    pub arbitrators_quorum: u32,
    /// Arbitrator keys, ordered.
    pub arbitrator_pubkeys: Vec<String>,
    /// Client keys, ordered.
    pub client_pubkeys: Vec<String>,
    /// Network name.
    pub network: String,
}

/// Raw contract-approval payload as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractApprovalPayload {
    /// Hex signature over the contract's canonical bytes.
    pub signature: String,
    /// Contract being approved.
    pub file_hash: String,
}

/// Envelope-level message, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum WireMessage {
    /// Proposal of a contract.
    ContractRequest(ContractRequestPayload),
    /// Signature over a contract.
    ContractApproval(ContractApprovalPayload),
}

/// The two message kinds, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `contract-request`
    ContractRequest,
    /// `contract-approval`
    ContractApproval,
}

impl MessageKind {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContractRequest => "contract-request",
            Self::ContractApproval => "contract-approval",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated contract-request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRequest {
    /// Contract key.
    pub file_hash: FileHash,
    /// Arbitrator quorum, at least 1.
    pub arbitrators_quorum: u32,
    /// Ordered key sets, no key repeated across them.
    pub parties: PartyKeys,
    /// Network name as sent. Checked when the address is derived.
    pub network: String,
}

impl ContractRequest {
    /// The declared network, if supported.
    pub fn network(&self) -> Result<Network, AddressError> {
        self.network.parse()
    }

    /// Wire form of this request.
    pub fn to_wire(&self) -> WireMessage {
        WireMessage::ContractRequest(ContractRequestPayload {
            file_hash: self.file_hash.to_string(),
            arbitrators_quorum: self.arbitrators_quorum,
            arbitrator_pubkeys: self.parties.arbitrators.iter().map(ToString::to_string).collect(),
            client_pubkeys: self.parties.clients.iter().map(ToString::to_string).collect(),
            network: self.network.clone(),
        })
    }
}

/// A validated contract-approval. The signer is the envelope's sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractApproval {
    /// Contract being approved.
    pub file_hash: FileHash,
    /// Lowercase hex signature.
    pub signature: String,
}

impl ContractApproval {
    /// Wire form of this approval.
    pub fn to_wire(&self) -> WireMessage {
        WireMessage::ContractApproval(ContractApprovalPayload {
            signature: self.signature.clone(),
            file_hash: self.file_hash.to_string(),
        })
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// See [`ContractRequest`].
    Request(ContractRequest),
    /// See [`ContractApproval`].
    Approval(ContractApproval),
}

impl Inbound {
    /// Which kind of message this is.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Request(_) => MessageKind::ContractRequest,
            Self::Approval(_) => MessageKind::ContractApproval,
        }
    }

    /// The contract the message concerns.
    pub fn file_hash(&self) -> &FileHash {
        match self {
            Self::Request(r) => &r.file_hash,
            Self::Approval(a) => &a.file_hash,
        }
    }
}

/// Decode and validate a decrypted message.
pub fn decode(plaintext: &str) -> Result<Inbound, DecodeError> {
    let wire: WireMessage =
        serde_json::from_str(plaintext).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    match wire {
        WireMessage::ContractRequest(payload) => validate_request(payload).map(Inbound::Request),
        WireMessage::ContractApproval(payload) => validate_approval(payload).map(Inbound::Approval),
    }
}

/// Encode a wire message as JSON.
pub fn encode(message: &WireMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

fn validate_request(payload: ContractRequestPayload) -> Result<ContractRequest, DecodeError> {
    let file_hash = parse_file_hash(&payload.file_hash)?;
    if payload.arbitrators_quorum == 0 {
        return Err(DecodeError::ZeroQuorum);
    }
    let parties = PartyKeys::new(
        parse_keys("clientPubkeys", &payload.client_pubkeys)?,
        parse_keys("arbitratorPubkeys", &payload.arbitrator_pubkeys)?,
    );
    if let Some(dup) = parties.first_duplicate() {
        return Err(DecodeError::DuplicateKey(dup.clone()));
    }
    Ok(ContractRequest {
        file_hash,
        arbitrators_quorum: payload.arbitrators_quorum,
        parties,
        network: payload.network,
    })
}

fn validate_approval(payload: ContractApprovalPayload) -> Result<ContractApproval, DecodeError> {
    let file_hash = parse_file_hash(&payload.file_hash)?;
    let signature = payload.signature.trim();
    hex::decode(signature, "signature").map_err(|e| DecodeError::InvalidField {
        field: "signature",
        reason: e.to_string(),
    })?;
    Ok(ContractApproval {
        file_hash,
        signature: signature.to_ascii_lowercase(),
    })
}

fn parse_file_hash(raw: &str) -> Result<FileHash, DecodeError> {
    FileHash::new(raw).map_err(|e| DecodeError::InvalidField {
        field: "fileHash",
        reason: e.to_string(),
    })
}

fn parse_keys(field: &'static str, raw: &[String]) -> Result<Vec<PartyKey>, DecodeError> {
    raw.iter()
        .map(|k| {
            PartyKey::new(k).map_err(|e| DecodeError::InvalidField {
                field,
                reason: e.to_string(),
            })
        })
        .collect()
}
