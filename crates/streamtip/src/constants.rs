use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Chiliz Spicy testnet chain ID.
pub const SPICY_CHAIN_ID: u64 = 88882;

/// Chiliz Chain mainnet chain ID.
pub const CHILIZ_CHAIN_ID: u64 = 88888;

/// x402 scheme used for tip payments.
pub const SCHEME_NAME: &str = "exact";

/// x402 protocol version spoken by the client and the settlement service.
pub const X402_VERSION: u32 = 1;

/// CHZ has 18 decimal places.
pub const NATIVE_DECIMALS: u32 = 18;

/// Tip amount used when a request does not name one.
pub const DEFAULT_TIP_AMOUNT: &str = "0.01";

/// Upper bound on a tip message, in characters.
pub const MAX_MESSAGE_LEN: usize = 280;

/// Path of the payment-gated tip endpoint.
pub const TIP_PATH: &str = "/api/tip";

/// Header carrying the base64 payment proof.
pub const PAYMENT_HEADER: &str = "X-PAYMENT";

/// Header carrying the base64 settlement summary on a paid response.
pub const PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

/// Network selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" | "spicy" | "" => Ok(Network::Testnet),
            "mainnet" | "chiliz" => Ok(Network::Mainnet),
            other => Err(ConfigError::InvalidValue {
                key: "NETWORK",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Testnet => f.write_str("testnet"),
            Network::Mainnet => f.write_str("mainnet"),
        }
    }
}

/// Runtime chain configuration, passed explicitly to every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    /// CAIP-2 identifier, e.g. `eip155:88882`.
    pub network: String,
    pub native_symbol: String,
    pub native_decimals: u32,
    pub rpc_url: String,
    pub explorer_base: String,
    pub scheme_name: String,
    /// EIP-712 domain used when a 402 challenge does not name one.
    pub eip712_domain_name: String,
    pub eip712_domain_version: String,
}

impl ChainConfig {
    pub fn spicy() -> Self {
        Self {
            chain_id: SPICY_CHAIN_ID,
            name: "Chiliz Spicy Testnet".to_string(),
            network: format!("eip155:{SPICY_CHAIN_ID}"),
            native_symbol: "CHZ".to_string(),
            native_decimals: NATIVE_DECIMALS,
            rpc_url: "https://spicy-rpc.chiliz.com".to_string(),
            explorer_base: "https://testnet.chiliscan.com".to_string(),
            scheme_name: SCHEME_NAME.to_string(),
            eip712_domain_name: "CHZ".to_string(),
            eip712_domain_version: "1".to_string(),
        }
    }

    pub fn chiliz() -> Self {
        Self {
            chain_id: CHILIZ_CHAIN_ID,
            name: "Chiliz Chain".to_string(),
            network: format!("eip155:{CHILIZ_CHAIN_ID}"),
            rpc_url: "https://rpc.ankr.com/chiliz".to_string(),
            explorer_base: "https://chiliscan.com".to_string(),
            ..Self::spicy()
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Testnet => Self::spicy(),
            Network::Mainnet => Self::chiliz(),
        }
    }

    /// Override the RPC endpoint (e.g. from `RPC_URL`).
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    pub fn tx_url(&self, tx_hash: impl fmt::Display) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_base)
    }

    pub fn address_url(&self, address: impl fmt::Display) -> String {
        format!("{}/address/{address}", self.explorer_base)
    }
}

impl Default for ChainConfig {
    /// Defaults to the Spicy testnet.
    fn default() -> Self {
        Self::spicy()
    }
}
