//! # Networks and Chain Families
//!
//! A contract declares the network its escrow lives on. The network picks
//! the chain family, and the chain family picks the address derivation path
//! and the signing domain.

use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// Address derivation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainFamily {
    /// Bitcoin-style chains with plain (unblinded) addresses.
    PlainUtxo,
    /// Elements/Liquid chains with confidential (blinded) addresses.
    Confidential,
}

impl ChainFamily {
    /// Stable name, used in signing domain tags and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainUtxo => "plain-utxo",
            Self::Confidential => "confidential",
        }
    }
}

impl std::fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A network a contract's escrow can live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Bitcoin mainnet.
    Bitcoin,
    /// Bitcoin testnet.
    Testnet,
    /// Bitcoin signet.
    Signet,
    /// Bitcoin regtest.
    Regtest,
    /// Liquid mainnet.
    Liquid,
    /// Liquid testnet.
    LiquidTestnet,
    /// Elements regtest.
    ElementsRegtest,
}

impl Network {
    /// Every supported network.
    pub const ALL: [Network; 7] = [
        Self::Bitcoin,
        Self::Testnet,
        Self::Signet,
        Self::Regtest,
        Self::Liquid,
        Self::LiquidTestnet,
        Self::ElementsRegtest,
    ];

    /// Wire name of the network.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bitcoin => "bitcoin",
            Self::Testnet => "testnet",
            Self::Signet => "signet",
            Self::Regtest => "regtest",
            Self::Liquid => "liquid",
            Self::LiquidTestnet => "liquidtestnet",
            Self::ElementsRegtest => "elementsregtest",
        }
    }

    /// The chain family this network belongs to.
    pub fn family(&self) -> ChainFamily {
        match self {
            Self::Bitcoin | Self::Testnet | Self::Signet | Self::Regtest => ChainFamily::PlainUtxo,
            Self::Liquid | Self::LiquidTestnet | Self::ElementsRegtest => ChainFamily::Confidential,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Network {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|n| n.as_str() == wanted)
            .ok_or_else(|| AddressError::UnsupportedNetwork(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_matches_wire_names() {
        for network in Network::ALL {
            assert_eq!(network.as_str().parse::<Network>().unwrap(), network);
            let json = serde_json::to_string(&network).unwrap();
            assert_eq!(json, format!("\"{}\"", network.as_str()));
        }
    }

    #[test]
    fn unknown_network_is_unsupported() {
        assert_eq!(
            "dogecoin".parse::<Network>(),
            Err(AddressError::UnsupportedNetwork("dogecoin".to_string()))
        );
    }

    #[test]
    fn families() {
        assert_eq!(Network::Bitcoin.family(), ChainFamily::PlainUtxo);
        assert_eq!(Network::Regtest.family(), ChainFamily::PlainUtxo);
        assert_eq!(Network::Liquid.family(), ChainFamily::Confidential);
        assert_eq!(Network::ElementsRegtest.family(), ChainFamily::Confidential);
    }
}
