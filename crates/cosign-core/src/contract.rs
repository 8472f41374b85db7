//! # Contract Record Model
//!
//! A [`ContractRecord`] describes one off-chain contract: the escrow that
//! collateralizes it, the transport identities of its parties and the
//! document it governs. Records are keyed by the document's [`FileHash`].
//!
//! ## Invariants
//!
//! - `document.fileHash` equals the key the record is stored under.
//! - `collateral.pubkeys`, `communication.identifiers` and
//!   `document.pubkeys` are denormalized copies of the same [`PartyKeys`].
//!
//! [`ContractRecord::new()`] establishes both; [`ContractRecord::is_consistent()`]
//! re-checks them on records read back from disk.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::{FileHash, PartyKey};
use crate::network::Network;

/// Schema version written into every new record.
pub const CONTRACT_RECORD_VERSION: u32 = 1;

/// Well-known blinding secret used for confidential escrow addresses.
///
/// Not derived per contract. Anyone holding this constant can unblind
/// amounts sent to the escrow.
pub const PLACEHOLDER_BLINDING_KEY: &str =
    "1111111111111111111111111111111111111111111111111111111111111111";

/// Collected signatures for one contract: signer key → hex signature.
pub type SignatureSet = BTreeMap<PartyKey, String>;

/// The ordered client and arbitrator key sets of a contract.
///
/// Order is significant: it is the order keys appear in the escrow script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyKeys {
    /// Client keys, in the order received.
    pub clients: Vec<PartyKey>,
    /// Arbitrator keys, in the order received.
    pub arbitrators: Vec<PartyKey>,
}

impl PartyKeys {
    /// Build from ordered client and arbitrator keys.
    pub fn new(clients: Vec<PartyKey>, arbitrators: Vec<PartyKey>) -> Self {
        Self {
            clients,
            arbitrators,
        }
    }

    /// Clients first, then arbitrators, without repeats.
    pub fn union(&self) -> Vec<PartyKey> {
        let mut out: Vec<PartyKey> = Vec::with_capacity(self.clients.len() + self.arbitrators.len());
        for key in self.clients.iter().chain(&self.arbitrators) {
            if !out.contains(key) {
                out.push(key.clone());
            }
        }
        out
    }

    /// Whether `key` is a client or an arbitrator.
    pub fn contains(&self, key: &PartyKey) -> bool {
        self.clients.contains(key) || self.arbitrators.contains(key)
    }

    /// First key that appears more than once across both sets, if any.
    pub fn first_duplicate(&self) -> Option<&PartyKey> {
        let all: Vec<&PartyKey> = self.clients.iter().chain(&self.arbitrators).collect();
        for (i, key) in all.iter().enumerate() {
            if all[..i].contains(key) {
                return Some(*key);
            }
        }
        None
    }
}

/// Escrow script variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollateralType {
    /// All clients cooperatively, or an arbitrator quorum plus one client.
    ArbitratedMultisig,
}

/// Transport kind the parties communicate over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationType {
    /// End-to-end encrypted direct messages on a public relay network.
    Nostr,
}

/// The on-chain collateral backing a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collateral {
    /// Arbitrator signatures needed on the dispute spending path.
    pub arbitrators_quorum: u32,
    /// Escrow address, always derived locally.
    pub multisig_address: String,
    /// Network the escrow lives on.
    pub network: Network,
    /// Blinding secret (hex) for confidential addresses.
    pub private_blinding_key: String,
    /// Escrow key sets.
    pub pubkeys: PartyKeys,
    /// Escrow script variant.
    #[serde(rename = "type")]
    pub kind: CollateralType,
}

/// How the parties reach each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    /// Transport identities.
    pub identifiers: PartyKeys,
    /// Transport kind.
    #[serde(rename = "type")]
    pub kind: CommunicationType,
}

/// The governed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDocument {
    /// Parties whose signatures the document needs.
    pub pubkeys: PartyKeys,
    /// Content hash of the document; also the record's key.
    pub file_hash: FileHash,
}

/// Contract metadata, keyed by [`FileHash`]. Signatures live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    /// Record schema version.
    pub version: u32,
    /// Escrow collateral.
    pub collateral: Collateral,
    /// Transport identities.
    pub communication: Communication,
    /// Governed document.
    pub document: ContractDocument,
}

impl ContractRecord {
    /// Build a record with every denormalized copy of `parties` in place.
    pub fn new(
        file_hash: FileHash,
        network: Network,
        parties: PartyKeys,
        arbitrators_quorum: u32,
        multisig_address: String,
    ) -> Self {
        Self {
            version: CONTRACT_RECORD_VERSION,
            collateral: Collateral {
                arbitrators_quorum,
                multisig_address,
                network,
                private_blinding_key: PLACEHOLDER_BLINDING_KEY.to_string(),
                pubkeys: parties.clone(),
                kind: CollateralType::ArbitratedMultisig,
            },
            communication: Communication {
                identifiers: parties.clone(),
                kind: CommunicationType::Nostr,
            },
            document: ContractDocument {
                pubkeys: parties,
                file_hash,
            },
        }
    }

    /// The record's key.
    pub fn file_hash(&self) -> &FileHash {
        &self.document.file_hash
    }

    /// The declared network.
    pub fn network(&self) -> Network {
        self.collateral.network
    }

    /// The document's party keys.
    pub fn parties(&self) -> &PartyKeys {
        &self.document.pubkeys
    }

    /// Everyone who must sign before the contract is complete, in order.
    pub fn required_signers(&self) -> Vec<PartyKey> {
        self.document.pubkeys.union()
    }

    /// Whether the denormalized key sets agree.
    pub fn is_consistent(&self) -> bool {
        self.collateral.pubkeys == self.document.pubkeys
            && self.communication.identifiers == self.document.pubkeys
    }
}
