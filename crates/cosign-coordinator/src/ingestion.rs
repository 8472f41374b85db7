//! # Event Ingestion
//!
//! Turns inbound envelopes into store mutations:
//!
//! - **contract-request** → derive the escrow address locally, build a
//!   [`ContractRecord`] and upsert it. A derivation failure rejects that
//!   request only.
//! - **contract-approval** → record the signature under the envelope's
//!   sender, whether or not the contract is known yet.
//!
//! Every error here is scoped to one message. The caller logs it and keeps
//! reading.

use std::sync::Arc;

use cosign_core::{ContractRecord, FileHash, Network, PartyKey};
use cosign_escrow::{AddressResolver, ScriptAddressResolver};

use crate::error::{DecodeError, IngestError};
use crate::messages::{self, ContractApproval, ContractRequest, Inbound};
use crate::store::ContractStore;
use crate::transport::{EncryptedTransport, Envelope};

/// What applying a message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new contract record was stored.
    ContractCreated {
        /// The new contract.
        file_hash: FileHash,
        /// Locally derived escrow address.
        multisig_address: String,
    },
    /// A record already existed; the request changed nothing.
    ContractAlreadyKnown {
        /// The existing contract.
        file_hash: FileHash,
    },
    /// A signature was stored.
    SignatureRecorded {
        /// Contract the signature is for.
        file_hash: FileHash,
        /// Envelope sender.
        signer: PartyKey,
    },
}

/// Applies decoded messages to a [`ContractStore`].
#[derive(Clone)]
pub struct EventIngestor {
    store: ContractStore,
    resolver: Arc<dyn AddressResolver>,
}

impl std::fmt::Debug for EventIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventIngestor")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl EventIngestor {
    /// Ingestor using [`ScriptAddressResolver`].
    pub fn new(store: ContractStore) -> Self {
        Self::with_resolver(store, Arc::new(ScriptAddressResolver))
    }

    /// Ingestor with a custom address resolver.
    pub fn with_resolver(store: ContractStore, resolver: Arc<dyn AddressResolver>) -> Self {
        Self { store, resolver }
    }

    /// The store this ingestor writes to.
    pub fn store(&self) -> &ContractStore {
        &self.store
    }

    /// Decrypt, decode and apply one envelope.
    pub async fn handle_envelope<T>(
        &self,
        transport: &T,
        envelope: &Envelope,
    ) -> Result<IngestOutcome, IngestError>
    where
        T: EncryptedTransport + ?Sized,
    {
        let plaintext = transport
            .decrypt(envelope)
            .await
            .map_err(|e| DecodeError::Undecryptable {
                sender: envelope.sender.clone(),
                reason: e.to_string(),
            })?;
        self.handle_plaintext(&envelope.sender, &plaintext)
    }

    /// Decode and apply one decrypted message from `sender`.
    pub fn handle_plaintext(
        &self,
        sender: &PartyKey,
        plaintext: &str,
    ) -> Result<IngestOutcome, IngestError> {
        let message = messages::decode(plaintext)?;
        tracing::debug!(
            kind = %message.kind(),
            file_hash = %message.file_hash(),
            sender = %sender,
            "decoded inbound message"
        );
        self.apply(sender, message)
    }

    /// Apply an already-decoded message.
    pub fn apply(&self, sender: &PartyKey, message: Inbound) -> Result<IngestOutcome, IngestError> {
        match message {
            Inbound::Request(request) => self.apply_request(request),
            Inbound::Approval(approval) => Ok(self.apply_approval(sender.clone(), approval)),
        }
    }

    /// Derive the escrow address for a request and store the resulting
    /// record, unless the contract already exists.
    pub fn apply_request(&self, request: ContractRequest) -> Result<IngestOutcome, IngestError> {
        let ContractRequest {
            file_hash,
            arbitrators_quorum,
            parties,
            network,
        } = request;
        let rejected = |source| IngestError::Address {
            file_hash: file_hash.clone(),
            source,
        };

        let network = network.parse::<Network>().map_err(rejected)?;
        let multisig_address = self
            .resolver
            .derive(network, &parties.clients, &parties.arbitrators, arbitrators_quorum)
            .map_err(rejected)?;

        let record = ContractRecord::new(
            file_hash.clone(),
            network,
            parties,
            arbitrators_quorum,
            multisig_address.clone(),
        );
        if self.store.upsert_contract(record) {
            tracing::info!(
                file_hash = %file_hash,
                network = %network,
                multisig_address = %multisig_address,
                "contract created"
            );
            Ok(IngestOutcome::ContractCreated {
                file_hash,
                multisig_address,
            })
        } else {
            tracing::debug!(file_hash = %file_hash, "contract already known, request ignored");
            Ok(IngestOutcome::ContractAlreadyKnown { file_hash })
        }
    }

    /// Record `signer`'s approval.
    pub fn apply_approval(&self, signer: PartyKey, approval: ContractApproval) -> IngestOutcome {
        let ContractApproval {
            file_hash,
            signature,
        } = approval;
        if !self.store.contains_contract(&file_hash) {
            tracing::debug!(file_hash = %file_hash, signer = %signer, "approval for unknown contract retained");
        }
        self.store
            .record_signature(file_hash.clone(), signer.clone(), signature);
        tracing::info!(file_hash = %file_hash, signer = %signer, "signature recorded");
        IngestOutcome::SignatureRecorded { file_hash, signer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosign_core::AddressError;
    use cosign_escrow::derive_escrow_address;
    use serde_json::json;

    const G: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const G2: &str = "c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";
    const G3: &str = "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";

    fn pk(s: &str) -> PartyKey {
        PartyKey::new(s).unwrap()
    }

    fn request(network: &str) -> String {
        json!({
            "kind": "contract-request",
            "payload": {
                "fileHash": "abc123",
                "arbitratorsQuorum": 1,
                "arbitratorPubkeys": [G3],
                "clientPubkeys": [G, G2],
                "network": network,
                "multisigAddress": "bc1qclaimedbysender"
            }
        })
        .to_string()
    }

    fn approval(signature: &str) -> String {
        json!({
            "kind": "contract-approval",
            "payload": {"signature": signature, "fileHash": "abc123"}
        })
        .to_string()
    }

    #[test]
    fn request_creates_record_with_local_address() {
        let ingestor = EventIngestor::new(ContractStore::new());
        let outcome = ingestor.handle_plaintext(&pk(G), &request("regtest")).unwrap();

        let expected =
            derive_escrow_address(Network::Regtest, &[pk(G), pk(G2)], &[pk(G3)], 1).unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::ContractCreated {
                file_hash: FileHash::new("abc123").unwrap(),
                multisig_address: expected.clone(),
            }
        );
        let record = ingestor
            .store()
            .get_contract(&FileHash::new("abc123").unwrap())
            .unwrap();
        assert_eq!(record.collateral.multisig_address, expected);
        assert_ne!(record.collateral.multisig_address, "bc1qclaimedbysender");
        assert!(record.is_consistent());
    }

    #[test]
    fn repeated_request_is_ignored() {
        let ingestor = EventIngestor::new(ContractStore::new());
        ingestor.handle_plaintext(&pk(G), &request("liquid")).unwrap();
        let again = ingestor.handle_plaintext(&pk(G2), &request("regtest")).unwrap();
        assert!(matches!(again, IngestOutcome::ContractAlreadyKnown { .. }));
        let record = ingestor
            .store()
            .get_contract(&FileHash::new("abc123").unwrap())
            .unwrap();
        assert_eq!(record.network(), Network::Liquid);
    }

    #[test]
    fn unsupported_network_creates_nothing() {
        let ingestor = EventIngestor::new(ContractStore::new());
        let err = ingestor
            .handle_plaintext(&pk(G), &request("dogecoin"))
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Address {
                source: AddressError::UnsupportedNetwork(_),
                ..
            }
        ));
        assert!(ingestor.store().is_empty());
    }

    #[test]
    fn off_curve_key_creates_nothing() {
        let ingestor = EventIngestor::new(ContractStore::new());
        let bad = "ff".repeat(32);
        let text = request("regtest").replace(G3, &bad);
        let err = ingestor.handle_plaintext(&pk(G), &text).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Address {
                source: AddressError::InvalidKeyMaterial { .. },
                ..
            }
        ));
        assert!(ingestor.store().is_empty());
    }

    #[test]
    fn approval_is_attributed_to_sender() {
        let ingestor = EventIngestor::new(ContractStore::new());
        let outcome = ingestor.handle_plaintext(&pk(G2), &approval("ABCD")).unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::SignatureRecorded {
                file_hash: FileHash::new("abc123").unwrap(),
                signer: pk(G2),
            }
        );
        assert_eq!(
            ingestor
                .store()
                .get_signature(&FileHash::new("abc123").unwrap(), &pk(G2))
                .as_deref(),
            Some("abcd")
        );
    }

    #[test]
    fn malformed_message_is_a_decode_error() {
        let ingestor = EventIngestor::new(ContractStore::new());
        assert!(matches!(
            ingestor.handle_plaintext(&pk(G), "{\"kind\":\"contract-request\"}"),
            Err(IngestError::Decode(DecodeError::Malformed(_)))
        ));
    }
}
