//! # Order Independence
//!
//! Inbound messages on an encrypted relay arrive in any order. Every
//! interleaving of one request and its approvals must end in the same
//! store state.

use std::sync::Arc;

use cosign_coordinator::{
    messages, signable_data, CompletionEngine, ContractApproval, ContractRequest, ContractStore,
    EventIngestor,
};
use cosign_core::{ContractRecord, FileHash, Network, PartyKey, PartyKeys};
use cosign_crypto::SchnorrKeyPair;
use cosign_escrow::derive_escrow_address;
use cosign_schema::SchemaValidator;
use proptest::prelude::*;

/// Fixed secrets so proptest failures replay identically.
fn keypair(seed: u8) -> SchnorrKeyPair {
    SchnorrKeyPair::from_secret_bytes(&[seed; 32]).unwrap()
}

/// (sender, plaintext) pairs: the request from the first client, then one
/// approval per party.
fn session(network: Network) -> (FileHash, Vec<(PartyKey, String)>) {
    let signers: Vec<SchnorrKeyPair> = (1..=4).map(keypair).collect();
    let keys: Vec<PartyKey> = signers.iter().map(SchnorrKeyPair::party_key).collect();
    let parties = PartyKeys::new(keys[..2].to_vec(), keys[2..].to_vec());
    let file_hash = FileHash::new("abc123").unwrap();

    let request = ContractRequest {
        file_hash: file_hash.clone(),
        arbitrators_quorum: 2,
        parties: parties.clone(),
        network: network.to_string(),
    };
    let address =
        derive_escrow_address(network, &parties.clients, &parties.arbitrators, 2).unwrap();
    let record = ContractRecord::new(file_hash.clone(), network, parties, 2, address);
    let data = signable_data(&record).unwrap();

    let mut events = vec![(
        keys[0].clone(),
        messages::encode(&request.to_wire()).unwrap(),
    )];
    for signer in &signers {
        let approval = ContractApproval {
            file_hash: file_hash.clone(),
            signature: signer.sign(network.family(), &data).to_hex(),
        };
        events.push((
            signer.party_key(),
            messages::encode(&approval.to_wire()).unwrap(),
        ));
    }
    (file_hash, events)
}

fn replay(events: &[(PartyKey, String)]) -> ContractStore {
    let store = ContractStore::new();
    let ingestor = EventIngestor::new(store.clone());
    for (sender, plaintext) in events {
        ingestor.handle_plaintext(sender, plaintext).unwrap();
    }
    store
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_interleaving_completes_with_identical_state(
        order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle(),
        confidential in any::<bool>(),
    ) {
        let network = if confidential { Network::ElementsRegtest } else { Network::Regtest };
        let (file_hash, events) = session(network);
        let baseline = replay(&events);

        let shuffled: Vec<_> = order.iter().map(|&i| events[i].clone()).collect();
        let store = replay(&shuffled);

        prop_assert_eq!(store.get_contract(&file_hash), baseline.get_contract(&file_hash));
        prop_assert_eq!(store.get_signatures(&file_hash), baseline.get_signatures(&file_hash));

        let engine = CompletionEngine::new(store, Arc::new(SchemaValidator::builtin().unwrap()));
        prop_assert!(engine.is_complete(&file_hash));
        prop_assert!(engine.verify_signatures(&file_hash).is_ok());
    }

    #[test]
    fn any_prefix_missing_an_approval_is_incomplete(
        skip in 1..5usize,
        order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let (file_hash, events) = session(Network::Testnet);
        let shuffled: Vec<_> = order
            .iter()
            .filter(|&&i| i != skip)
            .map(|&i| events[i].clone())
            .collect();
        let store = replay(&shuffled);
        let engine = CompletionEngine::new(store, Arc::new(SchemaValidator::builtin().unwrap()));
        prop_assert!(!engine.is_complete(&file_hash));
        prop_assert_eq!(
            engine.missing_signers(&file_hash),
            Some(vec![events[skip].0.clone()])
        );
    }
}
