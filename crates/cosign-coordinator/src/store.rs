//! # Contract Store
//!
//! In-memory registry of contract records and collected signatures, keyed
//! by [`FileHash`]. Both maps only grow for the life of the process.
//!
//! - Contract metadata is first-writer-wins. A second request for the same
//!   hash cannot redefine an in-flight contract.
//! - Signatures are last-write-wins per signer, and may arrive before the
//!   contract they sign.
//!
//! Every operation touches one key under a `parking_lot` lock that is never
//! held across `.await`. Observers learn about changes through
//! [`ContractStore::subscribe`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use cosign_core::{ContractRecord, FileHash, PartyKey, SignatureSet};
use parking_lot::RwLock;
use tokio::sync::broadcast;

/// Change-notification buffer size when none is given.
pub const DEFAULT_NOTIFY_CAPACITY: usize = 256;

/// A change to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A contract record was created.
    ContractAdded {
        /// The new contract.
        file_hash: FileHash,
    },
    /// A signature was recorded or replaced.
    SignatureRecorded {
        /// Contract the signature is for.
        file_hash: FileHash,
        /// Who signed.
        signer: PartyKey,
    },
}

/// Thread-safe, cloneable contract store. Clones share state.
#[derive(Debug, Clone)]
pub struct ContractStore {
    contracts: Arc<RwLock<HashMap<FileHash, ContractRecord>>>,
    signatures: Arc<RwLock<HashMap<FileHash, SignatureSet>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl ContractStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_notify_capacity(DEFAULT_NOTIFY_CAPACITY)
    }

    /// Create an empty store whose change feed buffers `capacity` events
    /// per subscriber.
    pub fn with_notify_capacity(capacity: usize) -> Self {
        Self {
            contracts: Arc::new(RwLock::new(HashMap::new())),
            signatures: Arc::new(RwLock::new(HashMap::new())),
            events: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Insert a record under its own `document.fileHash`, unless one is
    /// already there. Returns whether the record was inserted.
    pub fn upsert_contract(&self, record: ContractRecord) -> bool {
        let file_hash = record.file_hash().clone();
        let inserted = match self.contracts.write().entry(file_hash.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        };
        if inserted {
            self.notify(StoreEvent::ContractAdded { file_hash });
        }
        inserted
    }

    /// Record `signer`'s signature on `file_hash`, replacing any earlier one.
    /// Returns the replaced signature.
    pub fn record_signature(
        &self,
        file_hash: FileHash,
        signer: PartyKey,
        signature: String,
    ) -> Option<String> {
        let previous = self
            .signatures
            .write()
            .entry(file_hash.clone())
            .or_default()
            .insert(signer.clone(), signature);
        self.notify(StoreEvent::SignatureRecorded { file_hash, signer });
        previous
    }

    /// The record for `file_hash`, if a request has been ingested.
    pub fn get_contract(&self, file_hash: &FileHash) -> Option<ContractRecord> {
        self.contracts.read().get(file_hash).cloned()
    }

    /// Every signature recorded for `file_hash`; empty if none.
    pub fn get_signatures(&self, file_hash: &FileHash) -> SignatureSet {
        self.signatures
            .read()
            .get(file_hash)
            .cloned()
            .unwrap_or_default()
    }

    /// One signer's signature on `file_hash`.
    pub fn get_signature(&self, file_hash: &FileHash, signer: &PartyKey) -> Option<String> {
        self.signatures
            .read()
            .get(file_hash)
            .and_then(|set| set.get(signer).cloned())
    }

    /// Whether a record exists for `file_hash`.
    pub fn contains_contract(&self, file_hash: &FileHash) -> bool {
        self.contracts.read().contains_key(file_hash)
    }

    /// Hashes of every known contract, sorted.
    pub fn file_hashes(&self) -> Vec<FileHash> {
        let mut out: Vec<FileHash> = self.contracts.read().keys().cloned().collect();
        out.sort();
        out
    }

    /// Number of contract records.
    pub fn len(&self) -> usize {
        self.contracts.read().len()
    }

    /// Whether there are no contract records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive every subsequent [`StoreEvent`].
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: StoreEvent) {
        // No subscribers is the common case.
        let _ = self.events.send(event);
    }
}

impl Default for ContractStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosign_core::{Network, PartyKeys};
    use proptest::prelude::*;

    fn key(byte: u8) -> PartyKey {
        PartyKey::from_bytes(&[byte; 32])
    }

    fn hash(s: &str) -> FileHash {
        FileHash::new(s).unwrap()
    }

    fn record(file_hash: &str, address: &str) -> ContractRecord {
        ContractRecord::new(
            hash(file_hash),
            Network::Regtest,
            PartyKeys::new(vec![key(1), key(2)], vec![key(3)]),
            1,
            address.to_string(),
        )
    }

    #[test]
    fn new_store_is_empty() {
        let store = ContractStore::new();
        assert!(store.is_empty());
        assert!(store.get_contract(&hash("abc123")).is_none());
        assert!(store.get_signatures(&hash("abc123")).is_empty());
    }

    #[test]
    fn first_contract_wins() {
        let store = ContractStore::new();
        assert!(store.upsert_contract(record("abc123", "first")));
        assert!(!store.upsert_contract(record("abc123", "second")));
        let kept = store.get_contract(&hash("abc123")).unwrap();
        assert_eq!(kept.collateral.multisig_address, "first");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn signature_before_contract_is_kept() {
        let store = ContractStore::new();
        store.record_signature(hash("abc123"), key(1), "aa".to_string());
        assert!(!store.contains_contract(&hash("abc123")));
        store.upsert_contract(record("abc123", "addr"));
        assert_eq!(
            store.get_signature(&hash("abc123"), &key(1)).as_deref(),
            Some("aa")
        );
    }

    #[test]
    fn later_signature_replaces_earlier() {
        let store = ContractStore::new();
        assert!(store
            .record_signature(hash("abc123"), key(1), "aa".to_string())
            .is_none());
        let previous = store.record_signature(hash("abc123"), key(1), "bb".to_string());
        assert_eq!(previous.as_deref(), Some("aa"));
        assert_eq!(store.get_signatures(&hash("abc123")).len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let store = ContractStore::new();
        let other = store.clone();
        other.upsert_contract(record("abc123", "addr"));
        assert!(store.contains_contract(&hash("abc123")));
        assert_eq!(store.file_hashes(), vec![hash("abc123")]);
    }

    #[test]
    fn subscribers_see_changes_in_order() {
        let store = ContractStore::new();
        let mut events = store.subscribe();
        store.record_signature(hash("abc123"), key(2), "aa".to_string());
        store.upsert_contract(record("abc123", "addr"));
        store.upsert_contract(record("abc123", "ignored"));

        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::SignatureRecorded {
                file_hash: hash("abc123"),
                signer: key(2)
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::ContractAdded {
                file_hash: hash("abc123")
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn concurrent_writers_do_not_lose_signatures() {
        let store = ContractStore::new();
        let handles: Vec<_> = (1..=8u8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.upsert_contract(record("abc123", &format!("addr-{i}")));
                    store.record_signature(hash("abc123"), key(i), format!("{i:02x}"));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_signatures(&hash("abc123")).len(), 8);
    }

    proptest! {
        #[test]
        fn upsert_keeps_the_first_record(addresses in proptest::collection::vec("[a-z0-9]{1,20}", 1..10)) {
            let store = ContractStore::new();
            for address in &addresses {
                store.upsert_contract(record("abc123", address));
            }
            let kept = store.get_contract(&hash("abc123")).unwrap();
            prop_assert_eq!(&kept.collateral.multisig_address, &addresses[0]);
        }

        #[test]
        fn recorded_signatures_stay_recorded(signers in proptest::collection::vec(1u8..=50, 1..30)) {
            let store = ContractStore::new();
            for (i, s) in signers.iter().enumerate() {
                store.record_signature(hash("abc123"), key(*s), format!("{i:02x}"));
                for earlier in &signers[..=i] {
                    prop_assert!(store.get_signature(&hash("abc123"), &key(*earlier)).is_some());
                }
            }
        }
    }
}
