//! Livestream tipping on Chiliz Chain.
//!
//! Tips reach a streamer in one of two ways:
//!
//! - **Direct**: the viewer's wallet calls `tip(string)` on the tip jar
//!   contract with CHZ attached ([`tip_jar::submit_tip`]).
//! - **Gated**: the viewer POSTs to an x402 payment-gated endpoint, answers
//!   the 402 challenge with an EIP-712 signed `TransferWithAuthorization`,
//!   and the server settles it through a facilitator.
//!
//! This crate holds what both sides share: chain presets, the error
//! taxonomy, amount conversion, x402 wire types, signing helpers, contract
//! bindings and fan token deployment.
//!
//! ```no_run
//! use streamtip::{tip_jar, ChainConfig};
//! use alloy::signers::local::PrivateKeySigner;
//!
//! # async fn run() -> Result<(), streamtip::TipError> {
//! let signer: PrivateKeySigner = "0xYOUR_KEY".parse().unwrap();
//! let jar = "0x0000000000000000000000000000000000000001".parse().ok();
//! let receipt =
//!     tip_jar::submit_tip(&ChainConfig::spicy(), Some(&signer), jar, "gg", "0.5").await?;
//! println!("{}", receipt.explorer_url);
//! # Ok(())
//! # }
//! ```

// Core types
pub mod amount;
pub mod constants;
pub mod error;
pub mod payment;
pub mod response;
pub mod scheme;

// Signing and authentication
pub mod eip712;
pub mod hmac;
pub mod security;

// On-chain
pub mod deploy;
pub mod fan_token;
pub mod tip_jar;

use alloy::sol;

// EIP-3009 authorization signed for the `exact` scheme.
sol! {
    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
}

sol! {
    #[sol(rpc)]
    interface ITipJar {
        event TipReceived(address indexed from, uint256 amount, string message);

        function tip(string calldata message) external payable;
        function withdraw(address to) external;
        function owner() external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface IFanToken {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function mint(address to, uint256 amount) external;
    }
}

pub use amount::{format_units, parse_amount};
pub use constants::*;
pub use error::{ConfigError, TipError};
pub use payment::*;
pub use response::*;
pub use scheme::SchemeClient;
pub use tip_jar::{TipEvent, TipReceipt};
