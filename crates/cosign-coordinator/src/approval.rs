//! # Approval Controller
//!
//! Signs a contract's canonical bytes with the key for its network and
//! sends a contract-approval to every listed client and arbitrator, one
//! direct message per recipient. The signer's own key is on that list, so
//! a relay that echoes self-addressed messages delivers the approval back
//! through ingestion.
//!
//! Callers check the local document against the contract's hash (see
//! [`CompletionEngine::document_matches`](crate::completion::CompletionEngine::document_matches))
//! before calling [`ApprovalController::approve`].

use std::sync::Arc;

use cosign_core::error::CanonicalizationError;
use cosign_core::{CanonicalBytes, ContractRecord, FileHash, PartyKey};
use cosign_crypto::{ContractSigner, SignerError};

use crate::error::CoordinatorError;
use crate::messages::{self, ContractApproval};
use crate::store::ContractStore;
use crate::transport::{EncryptedTransport, TransportError};

/// The bytes every party signs for `record`.
pub fn signable_data(record: &ContractRecord) -> Result<CanonicalBytes, CanonicalizationError> {
    CanonicalBytes::new(record)
}

/// Result of one approval fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalReport {
    /// Contract approved.
    pub file_hash: FileHash,
    /// Local identity that signed.
    pub signer: PartyKey,
    /// Hex signature that was sent.
    pub signature: String,
    /// Recipients the relay accepted the approval for.
    pub delivered: Vec<PartyKey>,
    /// Recipients whose delivery failed, with the reason.
    pub failed: Vec<(PartyKey, TransportError)>,
    /// Whether the signature was also written to the local store.
    pub recorded_locally: bool,
}

impl ApprovalReport {
    /// Whether every recipient accepted the approval.
    pub fn is_fully_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Produces and distributes the local party's approvals.
#[derive(Clone)]
pub struct ApprovalController {
    store: ContractStore,
    identity: PartyKey,
    signer: Arc<dyn ContractSigner>,
    transport: Arc<dyn EncryptedTransport>,
    record_own_approval: bool,
}

impl std::fmt::Debug for ApprovalController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalController")
            .field("identity", &self.identity)
            .field("record_own_approval", &self.record_own_approval)
            .finish_non_exhaustive()
    }
}

impl ApprovalController {
    /// Controller that leaves the local store to self-reception.
    ///
    /// `identity` is the key `transport` sends as; peers record approvals
    /// under it.
    pub fn new(
        store: ContractStore,
        identity: PartyKey,
        signer: Arc<dyn ContractSigner>,
        transport: Arc<dyn EncryptedTransport>,
    ) -> Self {
        Self {
            store,
            identity,
            signer,
            transport,
            record_own_approval: false,
        }
    }

    /// Also write the local signature straight into the store.
    pub fn record_own_approval(mut self, enabled: bool) -> Self {
        self.record_own_approval = enabled;
        self
    }

    /// Sign `file_hash` and send the approval to every listed party.
    ///
    /// # Errors
    ///
    /// `UnknownContract` if no request for the hash has been ingested,
    /// `NoSigner` if no key is held for the contract's network, and
    /// `SignerMismatch` if that key is not the local identity. Delivery
    /// failures do not fail the call; they are listed in the report.
    pub async fn approve(&self, file_hash: &FileHash) -> Result<ApprovalReport, CoordinatorError> {
        let record = self
            .store
            .get_contract(file_hash)
            .ok_or_else(|| CoordinatorError::UnknownContract(file_hash.clone()))?;
        let network = record.network();
        let signer = self
            .signer
            .identity(network)
            .ok_or(CoordinatorError::NoSigner(network))?;
        if signer != self.identity {
            return Err(CoordinatorError::SignerMismatch {
                network,
                signer,
                identity: self.identity.clone(),
            });
        }

        let data = signable_data(&record)?;
        let signature = self
            .signer
            .sign(network, &data)
            .map_err(|SignerError::NoKeyForNetwork(n)| CoordinatorError::NoSigner(n))?
            .to_hex();

        let approval = ContractApproval {
            file_hash: file_hash.clone(),
            signature: signature.clone(),
        };
        let plaintext = messages::encode(&approval.to_wire())?;

        let mut delivered = Vec::new();
        let mut failed = Vec::new();
        for recipient in record.required_signers() {
            match self.transport.send(&recipient, &plaintext).await {
                Ok(()) => delivered.push(recipient),
                Err(e) => {
                    tracing::warn!(
                        file_hash = %file_hash,
                        recipient = %recipient,
                        error = %e,
                        "approval delivery failed"
                    );
                    failed.push((recipient, e));
                }
            }
        }

        if self.record_own_approval {
            self.store
                .record_signature(file_hash.clone(), signer.clone(), signature.clone());
        }

        tracing::info!(
            file_hash = %file_hash,
            signer = %signer,
            delivered = delivered.len(),
            failed = failed.len(),
            "approval sent"
        );
        Ok(ApprovalReport {
            file_hash: file_hash.clone(),
            signer,
            signature,
            delivered,
            failed,
            recorded_locally: self.record_own_approval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryRelay, MemoryTransport};
    use crate::messages::Inbound;
    use crate::transport::SubscriptionFilter;
    use cosign_core::{ChainFamily, Network, PartyKeys};
    use cosign_crypto::{verify_contract_signature, Keyring, SchnorrKeyPair};

    struct Fixture {
        relay: Arc<MemoryRelay>,
        store: ContractStore,
        me: SchnorrKeyPair,
        others: Vec<PartyKey>,
    }

    fn fixture(network: Network) -> Fixture {
        let me = SchnorrKeyPair::generate();
        let others: Vec<PartyKey> = (0..2).map(|_| SchnorrKeyPair::generate().party_key()).collect();
        let store = ContractStore::new();
        store.upsert_contract(ContractRecord::new(
            FileHash::new("abc123").unwrap(),
            network,
            PartyKeys::new(vec![me.party_key(), others[0].clone()], vec![others[1].clone()]),
            1,
            "escrow".to_string(),
        ));
        Fixture {
            relay: Arc::new(MemoryRelay::new()),
            store,
            me,
            others,
        }
    }

    fn controller(fx: &Fixture, keyring: Keyring) -> ApprovalController {
        ApprovalController::new(
            fx.store.clone(),
            fx.me.party_key(),
            Arc::new(keyring),
            Arc::new(MemoryTransport::new(fx.relay.clone(), fx.me.party_key())),
        )
    }

    #[tokio::test]
    async fn fans_out_to_every_listed_party_including_self() {
        let fx = fixture(Network::Regtest);
        let mut inboxes = Vec::new();
        let mut recipients = vec![fx.me.party_key()];
        recipients.extend(fx.others.iter().cloned());
        for key in &recipients {
            let t = MemoryTransport::new(fx.relay.clone(), key.clone());
            inboxes.push((
                t.clone(),
                t.subscribe(&SubscriptionFilter::direct_to(key.clone())).await.unwrap(),
            ));
        }

        let report = controller(&fx, Keyring::single(fx.me.clone()))
            .approve(&FileHash::new("abc123").unwrap())
            .await
            .unwrap();
        assert_eq!(report.delivered, recipients);
        assert!(report.is_fully_delivered());
        assert!(!report.recorded_locally);

        for (transport, sub) in &mut inboxes {
            let envelope = sub.next().await.unwrap().unwrap();
            assert_eq!(envelope.sender, fx.me.party_key());
            let plaintext = transport.decrypt(&envelope).await.unwrap();
            let Inbound::Approval(approval) = messages::decode(&plaintext).unwrap() else {
                panic!("expected approval");
            };
            assert_eq!(approval.signature, report.signature);
        }
    }

    #[tokio::test]
    async fn signature_verifies_against_signer_key() {
        let fx = fixture(Network::Liquid);
        let report = controller(&fx, Keyring::single(fx.me.clone()))
            .approve(&FileHash::new("abc123").unwrap())
            .await
            .unwrap();
        let record = fx.store.get_contract(&FileHash::new("abc123").unwrap()).unwrap();
        verify_contract_signature(
            ChainFamily::Confidential,
            &signable_data(&record).unwrap(),
            &report.signature,
            &fx.me.party_key(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn missing_key_for_network_is_no_signer() {
        let fx = fixture(Network::Liquid);
        let keyring = Keyring::new().with_key(ChainFamily::PlainUtxo, fx.me.clone());
        let err = controller(&fx, keyring)
            .approve(&FileHash::new("abc123").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::NoSigner(Network::Liquid)));
    }

    #[tokio::test]
    async fn signer_other_than_identity_is_rejected() {
        let fx = fixture(Network::Liquid);
        let liquid_only = SchnorrKeyPair::generate();
        let keyring = Keyring::single(fx.me.clone())
            .with_key(ChainFamily::Confidential, liquid_only.clone());
        let peer = MemoryTransport::new(fx.relay.clone(), fx.others[0].clone());
        let mut inbox = peer
            .subscribe(&SubscriptionFilter::direct_to(fx.others[0].clone()))
            .await
            .unwrap();
        let err = controller(&fx, keyring)
            .record_own_approval(true)
            .approve(&FileHash::new("abc123").unwrap())
            .await
            .unwrap_err();
        match err {
            CoordinatorError::SignerMismatch {
                network,
                signer,
                identity,
            } => {
                assert_eq!(network, Network::Liquid);
                assert_eq!(signer, liquid_only.party_key());
                assert_eq!(identity, fx.me.party_key());
            }
            other => panic!("expected SignerMismatch, got {other:?}"),
        }
        assert!(fx
            .store
            .get_signatures(&FileHash::new("abc123").unwrap())
            .is_empty());
        let nothing_sent =
            tokio::time::timeout(std::time::Duration::from_millis(50), inbox.next()).await;
        assert!(nothing_sent.is_err());
    }

    #[tokio::test]
    async fn unknown_contract_is_reported() {
        let fx = fixture(Network::Regtest);
        let err = controller(&fx, Keyring::single(fx.me.clone()))
            .approve(&FileHash::new("beef").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::UnknownContract(_)));
    }

    #[tokio::test]
    async fn one_failed_recipient_does_not_stop_the_rest() {
        let fx = fixture(Network::Regtest);
        fx.relay.set_unreachable(&fx.others[0], true);
        let report = controller(&fx, Keyring::single(fx.me.clone()))
            .approve(&FileHash::new("abc123").unwrap())
            .await
            .unwrap();
        assert_eq!(report.delivered, vec![fx.me.party_key(), fx.others[1].clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, fx.others[0]);
        assert!(!report.is_fully_delivered());
    }

    #[tokio::test]
    async fn own_approval_recorded_when_enabled() {
        let fx = fixture(Network::Regtest);
        let file_hash = FileHash::new("abc123").unwrap();
        controller(&fx, Keyring::single(fx.me.clone()))
            .approve(&file_hash)
            .await
            .unwrap();
        assert!(fx.store.get_signature(&file_hash, &fx.me.party_key()).is_none());

        let report = controller(&fx, Keyring::single(fx.me.clone()))
            .record_own_approval(true)
            .approve(&file_hash)
            .await
            .unwrap();
        assert!(report.recorded_locally);
        assert_eq!(
            fx.store.get_signature(&file_hash, &fx.me.party_key()),
            Some(report.signature)
        );
    }
}
