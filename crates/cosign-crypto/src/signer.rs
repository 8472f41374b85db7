//! # Signing Service
//!
//! [`ContractSigner`] is the seam the approval path signs through.
//! [`Keyring`] is the local implementation: one key pair per chain family,
//! so a party can hold a Liquid identity without a Bitcoin one. A key that
//! differs from the party's transport identity is refused at approval.

use std::collections::HashMap;

use cosign_core::{CanonicalBytes, ChainFamily, Network, PartyKey};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::schnorr::{SchnorrKeyPair, SchnorrSignature};

/// Environment variable holding the 64-hex-char signing secret.
pub const SIGNING_KEY_ENV: &str = "COSIGN_SIGNING_KEY_HEX";

/// The signing service has no key for a network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// No key pair is registered for the network's chain family.
    #[error("no signing key for network {0}")]
    NoKeyForNetwork(Network),
}

/// Error loading signing key material.
#[derive(Error, Debug)]
pub enum KeyLoadError {
    /// The environment variable is not set.
    #[error("{0} is not set")]
    Missing(&'static str),

    /// The key material is malformed.
    #[error("{var} is invalid: {reason}")]
    Invalid {
        /// Where the key came from.
        var: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Produces signatures over canonical contract data.
pub trait ContractSigner: Send + Sync {
    /// The party key that signs for `network`, if any.
    fn identity(&self, network: Network) -> Option<PartyKey>;

    /// Sign `data` with the key for `network`.
    fn sign(&self, network: Network, data: &CanonicalBytes) -> Result<SchnorrSignature, SignerError>;
}

/// Key pairs indexed by chain family.
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    keys: HashMap<ChainFamily, SchnorrKeyPair>,
}

impl Keyring {
    /// An empty keyring. Every signing attempt fails with `NoKeyForNetwork`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A keyring that signs for every chain family with one key pair.
    pub fn single(keypair: SchnorrKeyPair) -> Self {
        Self::new()
            .with_key(ChainFamily::PlainUtxo, keypair.clone())
            .with_key(ChainFamily::Confidential, keypair)
    }

    /// Register a key pair for a chain family, replacing any previous one.
    pub fn with_key(mut self, family: ChainFamily, keypair: SchnorrKeyPair) -> Self {
        self.keys.insert(family, keypair);
        self
    }

    /// Load a single-key keyring from [`SIGNING_KEY_ENV`].
    pub fn from_env() -> Result<Self, KeyLoadError> {
        let hex = Zeroizing::new(
            std::env::var(SIGNING_KEY_ENV).map_err(|_| KeyLoadError::Missing(SIGNING_KEY_ENV))?,
        );
        let keypair = SchnorrKeyPair::from_secret_hex(&hex).map_err(|e| KeyLoadError::Invalid {
            var: SIGNING_KEY_ENV,
            reason: e.to_string(),
        })?;
        tracing::info!(party = %keypair.party_key(), "loaded signing key from environment");
        Ok(Self::single(keypair))
    }

    /// Chain families this keyring can sign for.
    pub fn families(&self) -> Vec<ChainFamily> {
        let mut out: Vec<ChainFamily> = self.keys.keys().copied().collect();
        out.sort();
        out
    }
}

impl ContractSigner for Keyring {
    fn identity(&self, network: Network) -> Option<PartyKey> {
        self.keys.get(&network.family()).map(SchnorrKeyPair::party_key)
    }

    fn sign(&self, network: Network, data: &CanonicalBytes) -> Result<SchnorrSignature, SignerError> {
        let keypair = self
            .keys
            .get(&network.family())
            .ok_or(SignerError::NoKeyForNetwork(network))?;
        Ok(keypair.sign(network.family(), data))
    }
}
