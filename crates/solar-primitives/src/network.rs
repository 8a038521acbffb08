use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consensus::Params;

/// Errors that can occur when parsing a chain type.
#[derive(Clone, Debug, Error)]
pub enum ChainTypeError {
    /// The provided chain type string is invalid.
    #[error("Invalid chain type: {0}")]
    InvalidChainType(String),
}

/// The network variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Main network.
    Mainnet,
    /// Public test network.
    Testnet,
    /// Local regression test network.
    Regtest,
}

impl Network {
    /// Returns the string representation of this network.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "solarcoin",
            Network::Testnet => "solartestnet",
            Network::Regtest => "solarregtest",
        }
    }

    /// Returns the consensus parameters for this network.
    pub fn consensus_params(self) -> Params {
        match self {
            Network::Mainnet => Params::MAINNET,
            Network::Testnet => Params::TESTNET,
            Network::Regtest => Params::REGTEST,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ChainTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::try_from(s)
    }
}

impl TryFrom<&str> for Network {
    type Error = ChainTypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "solarcoin" | "mainnet" => Ok(Network::Mainnet),
            "solartestnet" | "testnet" => Ok(Network::Testnet),
            "solarregtest" | "regtest" => Ok(Network::Regtest),
            other => Err(ChainTypeError::InvalidChainType(other.to_string())),
        }
    }
}

impl TryFrom<String> for Network {
    type Error = ChainTypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Network::try_from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("solarcoin".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!(
            Network::try_from(String::from("solarregtest")).unwrap(),
            Network::Regtest
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = "bitcoin".parse::<Network>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid chain type: bitcoin");
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for network in [Network::Mainnet, Network::Testnet, Network::Regtest] {
            assert_eq!(network.to_string().parse::<Network>().unwrap(), network);
            assert_eq!(network.consensus_params().network, network);
        }
    }
}
