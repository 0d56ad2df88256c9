//! Viewer-side tipping.
//!
//! - [`TipSender`] runs a [`TipRequest`] on the direct tip jar path or the
//!   x402 gated path.
//! - [`X402Client`] answers 402 challenges with [`ExactSchemeClient`] signatures.
//! - [`RoomController`] tracks room, wallet and in-flight tip state.
//!
//! ```no_run
//! use streamtip::ChainConfig;
//! use streamtip_client::{TipRequest, TipSender};
//! use streamtip_wallet::{WalletAdapter, LOCAL_PROVIDER};
//!
//! # async fn run() -> Result<(), streamtip::TipError> {
//! let chain = ChainConfig::spicy();
//! let wallet = WalletAdapter::with_defaults(chain.clone(), std::env::var("WALLET_PRIVATE_KEY").ok());
//! let session = wallet.connect(LOCAL_PROVIDER).await?;
//!
//! let sender = TipSender::new(chain, "my-app")?;
//! let request = TipRequest::gated("http://localhost:3001/api/tip", "great stream!", "0.01");
//! let outcome = sender.send(Some(&session), &request).await?;
//! println!("{:?}", outcome.transaction_hash());
//! # Ok(())
//! # }
//! ```

pub mod config;
mod http_client;
pub mod room;
mod scheme_client;
pub mod tip_builder;

pub use config::{ClientConfig, LivestreamConfig};
pub use http_client::{
    build_http_client, decode_payment, encode_payment, GatedResponse, X402Client,
    CLIENT_ID_HEADER,
};
pub use room::{
    FanTokenStatus, JoinRequest, Role, RoomController, RoomState, RoomTicket, WalletState,
};
pub use scheme_client::ExactSchemeClient;
pub use tip_builder::{GatedTip, TipOutcome, TipRequest, TipSender, TipTarget};

pub use streamtip::{ChainConfig, TipError};
