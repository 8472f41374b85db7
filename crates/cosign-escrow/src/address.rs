//! # Escrow Address Derivation
//!
//! Plain-UTXO networks get a native segwit P2WSH address. Confidential
//! networks get an Elements P2WSH address blinded with the public key of
//! [`PLACEHOLDER_BLINDING_KEY`].

use cosign_core::{hex, AddressError, ChainFamily, Network, PartyKey, PLACEHOLDER_BLINDING_KEY};
use elements::secp256k1_zkp;

use crate::script::EscrowPolicy;

/// Computes the escrow address a contract commits to.
pub trait AddressResolver: Send + Sync {
    /// Derive the address for `network` from ordered key sets and a quorum.
    fn derive(
        &self,
        network: Network,
        clients: &[PartyKey],
        arbitrators: &[PartyKey],
        quorum: u32,
    ) -> Result<String, AddressError>;
}

/// Resolver backed by [`derive_escrow_address`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptAddressResolver;

impl AddressResolver for ScriptAddressResolver {
    fn derive(
        &self,
        network: Network,
        clients: &[PartyKey],
        arbitrators: &[PartyKey],
        quorum: u32,
    ) -> Result<String, AddressError> {
        derive_escrow_address(network, clients, arbitrators, quorum)
    }
}

/// Derive the escrow address for a contract.
///
/// Keys are used in the order given. Fails with `InvalidKeyMaterial` when a
/// key is not a valid x coordinate and with `InvalidQuorum` when the quorum
/// does not fit the key sets.
pub fn derive_escrow_address(
    network: Network,
    clients: &[PartyKey],
    arbitrators: &[PartyKey],
    quorum: u32,
) -> Result<String, AddressError> {
    let policy = EscrowPolicy::new(clients, arbitrators, quorum)?;
    let address = match network.family() {
        ChainFamily::PlainUtxo => {
            let script = policy.bitcoin_script();
            bitcoin::Address::p2wsh(&script, bitcoin_network(network)?).to_string()
        }
        ChainFamily::Confidential => {
            let script = policy.elements_script();
            let blinder = placeholder_blinder()?;
            elements::Address::p2wsh(&script, Some(blinder), elements_params(network)?).to_string()
        }
    };
    tracing::debug!(
        network = %network,
        clients = clients.len(),
        arbitrators = arbitrators.len(),
        quorum,
        %address,
        "derived escrow address"
    );
    Ok(address)
}

fn bitcoin_network(network: Network) -> Result<bitcoin::Network, AddressError> {
    match network {
        Network::Bitcoin => Ok(bitcoin::Network::Bitcoin),
        Network::Testnet => Ok(bitcoin::Network::Testnet),
        Network::Signet => Ok(bitcoin::Network::Signet),
        Network::Regtest => Ok(bitcoin::Network::Regtest),
        other => Err(AddressError::UnsupportedNetwork(other.to_string())),
    }
}

fn elements_params(network: Network) -> Result<&'static elements::AddressParams, AddressError> {
    match network {
        Network::Liquid => Ok(&elements::AddressParams::LIQUID),
        Network::LiquidTestnet => Ok(&elements::AddressParams::LIQUID_TESTNET),
        Network::ElementsRegtest => Ok(&elements::AddressParams::ELEMENTS),
        other => Err(AddressError::UnsupportedNetwork(other.to_string())),
    }
}

fn placeholder_blinder() -> Result<secp256k1_zkp::PublicKey, AddressError> {
    let invalid = |reason: String| AddressError::InvalidKeyMaterial {
        key: "privateBlindingKey".to_string(),
        reason,
    };
    let bytes = hex::decode_array::<32>(PLACEHOLDER_BLINDING_KEY, "blinding key")
        .map_err(|e| invalid(e.to_string()))?;
    let secret = secp256k1_zkp::SecretKey::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;
    Ok(secp256k1_zkp::PublicKey::from_secret_key(
        &secp256k1_zkp::Secp256k1::signing_only(),
        &secret,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
    use proptest::prelude::*;

    fn party(seed: u8) -> PartyKey {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[seed; 32]).unwrap();
        let (xonly, _) = PublicKey::from_secret_key(&secp, &sk).x_only_public_key();
        PartyKey::from_bytes(&xonly.serialize())
    }

    fn sets() -> (Vec<PartyKey>, Vec<PartyKey>) {
        (vec![party(1), party(2)], vec![party(3)])
    }

    #[test]
    fn plain_addresses_use_network_hrp() {
        let (c, a) = sets();
        assert!(derive_escrow_address(Network::Bitcoin, &c, &a, 1).unwrap().starts_with("bc1q"));
        assert!(derive_escrow_address(Network::Testnet, &c, &a, 1).unwrap().starts_with("tb1q"));
        assert!(derive_escrow_address(Network::Regtest, &c, &a, 1).unwrap().starts_with("bcrt1q"));
    }

    #[test]
    fn confidential_addresses_are_blinded() {
        let (c, a) = sets();
        let liquid = derive_escrow_address(Network::Liquid, &c, &a, 1).unwrap();
        assert!(liquid.starts_with("lq1"), "{liquid}");
        let parsed: elements::Address = liquid.parse().unwrap();
        assert!(parsed.is_blinded());
    }

    #[test]
    fn families_diverge_for_identical_inputs() {
        let (c, a) = sets();
        let plain = derive_escrow_address(Network::Bitcoin, &c, &a, 1).unwrap();
        let confidential = derive_escrow_address(Network::Liquid, &c, &a, 1).unwrap();
        assert_ne!(plain, confidential);
        assert_eq!(plain, derive_escrow_address(Network::Bitcoin, &c, &a, 1).unwrap());
        assert_eq!(confidential, derive_escrow_address(Network::Liquid, &c, &a, 1).unwrap());
    }

    #[test]
    fn key_order_is_preserved() {
        let a = [party(3)];
        let forward = derive_escrow_address(Network::Regtest, &[party(1), party(2)], &a, 1).unwrap();
        let reversed = derive_escrow_address(Network::Regtest, &[party(2), party(1)], &a, 1).unwrap();
        assert_ne!(forward, reversed);
    }

    #[test]
    fn quorum_changes_the_address() {
        let c = [party(1)];
        let a = [party(2), party(3)];
        assert_ne!(
            derive_escrow_address(Network::Signet, &c, &a, 1).unwrap(),
            derive_escrow_address(Network::Signet, &c, &a, 2).unwrap()
        );
    }

    #[test]
    fn off_curve_key_is_rejected() {
        let bad = PartyKey::new(&"ff".repeat(32)).unwrap();
        let err = derive_escrow_address(Network::Liquid, &[party(1)], &[bad], 1).unwrap_err();
        assert!(matches!(err, AddressError::InvalidKeyMaterial { .. }));
    }

    #[test]
    fn resolver_trait_matches_free_function() {
        let (c, a) = sets();
        let resolver: &dyn AddressResolver = &ScriptAddressResolver;
        assert_eq!(
            resolver.derive(Network::LiquidTestnet, &c, &a, 1).unwrap(),
            derive_escrow_address(Network::LiquidTestnet, &c, &a, 1).unwrap()
        );
    }

    proptest! {
        #[test]
        fn derivation_is_deterministic(seeds in proptest::collection::vec(1u8..=200, 2..6), q in 1u32..3) {
            let mut keys: Vec<PartyKey> = seeds.iter().copied().map(party).collect();
            keys.dedup();
            prop_assume!(keys.len() >= 3);
            let (clients, arbitrators) = keys.split_at(1);
            prop_assume!(q as usize <= arbitrators.len());
            for network in Network::ALL {
                let first = derive_escrow_address(network, clients, arbitrators, q).unwrap();
                let second = derive_escrow_address(network, clients, arbitrators, q).unwrap();
                prop_assert_eq!(first, second);
            }
        }
    }
}
