use crate::network::Network;

/// Protocol version announced by this implementation and written into
/// network-context locators.
pub const PROTOCOL_VERSION: i32 = 70015;

/// Consensus parameters for different networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    /// Network for which these parameters are defined.
    pub network: Network,
    /// Protocol version used for network serialization.
    pub protocol_version: i32,
    /// Maximum block weight accepted by consensus.
    pub max_block_weight: u64,
}

impl Params {
    /// Consensus parameters for the main network.
    pub const MAINNET: Self = Self {
        network: Network::Mainnet,
        protocol_version: PROTOCOL_VERSION,
        max_block_weight: 4_000_000,
    };
    /// Consensus parameters for the test network.
    pub const TESTNET: Self = Self {
        network: Network::Testnet,
        protocol_version: PROTOCOL_VERSION,
        max_block_weight: 4_000_000,
    };
    /// Consensus parameters for the regression test network.
    pub const REGTEST: Self = Self {
        network: Network::Regtest,
        protocol_version: PROTOCOL_VERSION,
        max_block_weight: 4_000_000,
    };
}

impl AsRef<Params> for Params {
    fn as_ref(&self) -> &Params {
        self
    }
}
