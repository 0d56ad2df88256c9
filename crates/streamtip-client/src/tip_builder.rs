//! Tip request construction and payment path selection.
//!
//! A [`TipRequest`] names exactly one target: a tip jar contract (direct
//! path) or a payment-gated resource URL (gated path). [`TipSender::send`]
//! validates the whole request before any network or chain I/O and then
//! runs the chosen path once.

use alloy::primitives::{Address, U256};
use serde_json::json;
use streamtip::tip_jar::{self, check_message};
use streamtip::{parse_amount, ChainConfig, PaymentResponse, TipError, TipReceipt};
use streamtip_wallet::WalletSession;

use crate::http_client::{build_http_client, X402Client};
use crate::scheme_client::ExactSchemeClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TipTarget {
    /// Direct call into the tip jar. `None` when no contract is configured.
    Contract(Option<Address>),
    /// POST to a payment-gated endpoint.
    Resource(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipRequest {
    pub message: String,
    /// Decimal CHZ amount as typed by the user.
    pub amount: String,
    pub target: TipTarget,
}

impl TipRequest {
    pub fn direct(
        contract: Option<Address>,
        message: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            amount: amount.into(),
            target: TipTarget::Contract(contract),
        }
    }

    pub fn gated(
        resource: impl Into<String>,
        message: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            amount: amount.into(),
            target: TipTarget::Resource(resource.into()),
        }
    }

    /// Check wallet, target, amount and message, in that order.
    /// Returns the amount in base units.
    pub fn validate(
        &self,
        session: Option<&WalletSession>,
        decimals: u32,
    ) -> Result<U256, TipError> {
        if session.is_none() {
            return Err(TipError::NoWallet);
        }
        match &self.target {
            TipTarget::Contract(None) => {
                return Err(TipError::Validation(
                    "tip jar contract address is not configured".to_string(),
                ))
            }
            TipTarget::Resource(url) if url.trim().is_empty() => {
                return Err(TipError::Validation(
                    "tip endpoint URL is empty".to_string(),
                ))
            }
            _ => {}
        }
        let amount = parse_amount(&self.amount, decimals)?;
        check_message(&self.message)?;
        Ok(amount)
    }
}

/// Result of a gated tip.
#[derive(Debug, Clone)]
pub struct GatedTip {
    pub transaction_hash: Option<String>,
    pub amount: String,
    pub message: String,
    pub settlement: Option<PaymentResponse>,
    /// Server JSON body as returned.
    pub response: serde_json::Value,
}

#[derive(Debug, Clone)]
pub enum TipOutcome {
    Direct(TipReceipt),
    Gated(GatedTip),
}

impl TipOutcome {
    pub fn transaction_hash(&self) -> Option<String> {
        match self {
            TipOutcome::Direct(receipt) => Some(receipt.transaction_hash.to_string()),
            TipOutcome::Gated(tip) => tip.transaction_hash.clone(),
        }
    }
}

/// Executes tip requests on either path.
#[derive(Clone)]
pub struct TipSender {
    chain: ChainConfig,
    client_id: String,
    http: reqwest::Client,
}

impl TipSender {
    pub fn new(chain: ChainConfig, client_id: impl Into<String>) -> Result<Self, TipError> {
        Ok(Self {
            chain,
            client_id: client_id.into(),
            http: build_http_client()?,
        })
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub async fn send(
        &self,
        session: Option<&WalletSession>,
        request: &TipRequest,
    ) -> Result<TipOutcome, TipError> {
        let amount_wei = request.validate(session, self.chain.native_decimals)?;
        let session = session.ok_or(TipError::NoWallet)?;

        match &request.target {
            TipTarget::Contract(contract) => {
                let receipt = tip_jar::submit_tip(
                    &self.chain,
                    Some(session.signer()),
                    *contract,
                    &request.message,
                    &request.amount,
                )
                .await?;
                Ok(TipOutcome::Direct(receipt))
            }
            TipTarget::Resource(url) => {
                let tip = self.send_gated(session, url, request, amount_wei).await?;
                Ok(TipOutcome::Gated(tip))
            }
        }
    }

    async fn send_gated(
        &self,
        session: &WalletSession,
        url: &str,
        request: &TipRequest,
        amount_wei: U256,
    ) -> Result<GatedTip, TipError> {
        let scheme = ExactSchemeClient::new(session.signer().clone(), self.chain.clone());
        let client = X402Client::with_http_client(scheme, self.http.clone(), &self.client_id);
        let body = json!({
            "message": request.message,
            "amount": request.amount,
        });

        tracing::info!(url, from = %session.address, amount = %request.amount, "Sending gated tip");
        let resp = client.post_json(url, &body, Some(amount_wei)).await?;

        let transaction_hash = resp
            .body
            .get("transactionHash")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| resp.settlement.as_ref().map(|s| s.transaction.clone()));

        Ok(GatedTip {
            transaction_hash,
            amount: request.amount.clone(),
            message: request.message.clone(),
            settlement: resp.settlement,
            response: resp.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamtip::{MAX_MESSAGE_LEN, NATIVE_DECIMALS};
    use streamtip_wallet::{WalletAdapter, EPHEMERAL_PROVIDER};

    async fn session() -> WalletSession {
        WalletAdapter::with_defaults(ChainConfig::spicy(), None)
            .connect(EPHEMERAL_PROVIDER)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn validation_order() {
        let s = session().await;
        let jar = Some(Address::with_last_byte(1));

        let bad_everything = TipRequest::direct(None, "x".repeat(MAX_MESSAGE_LEN + 1), "0");
        assert!(matches!(
            bad_everything.validate(None, NATIVE_DECIMALS),
            Err(TipError::NoWallet)
        ));
        assert!(matches!(
            bad_everything.validate(Some(&s), NATIVE_DECIMALS),
            Err(TipError::Validation(_))
        ));

        let zero = TipRequest::direct(jar, "hi", "0");
        assert!(matches!(
            zero.validate(Some(&s), NATIVE_DECIMALS),
            Err(TipError::InvalidAmount(_))
        ));

        let long = TipRequest::direct(jar, "x".repeat(MAX_MESSAGE_LEN + 1), "1");
        assert!(matches!(
            long.validate(Some(&s), NATIVE_DECIMALS),
            Err(TipError::Validation(_))
        ));

        let ok = TipRequest::gated("http://localhost:3001/api/tip", "hi", "0.015");
        assert_eq!(
            ok.validate(Some(&s), NATIVE_DECIMALS).unwrap(),
            U256::from(15_000_000_000_000_000u64)
        );
        assert!(TipRequest::gated(" ", "hi", "1")
            .validate(Some(&s), NATIVE_DECIMALS)
            .is_err());
    }

    #[tokio::test]
    async fn send_fails_fast_without_io() {
        // Unroutable endpoints: any I/O would surface as a different error.
        let chain = ChainConfig::spicy().with_rpc_url("http://127.0.0.1:1");
        let sender = TipSender::new(chain, "test-client").unwrap();

        let err = sender
            .send(None, &TipRequest::gated("http://127.0.0.1:1/api/tip", "", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TipError::NoWallet));

        let s = session().await;
        let err = sender
            .send(Some(&s), &TipRequest::direct(None, "", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TipError::Validation(_)));

        let err = sender
            .send(Some(&s), &TipRequest::gated("http://127.0.0.1:1/api/tip", "", "-3"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn unreachable_endpoint_suggests_direct_path() {
        let sender = TipSender::new(ChainConfig::spicy(), "test-client").unwrap();
        let s = session().await;
        let err = sender
            .send(Some(&s), &TipRequest::gated("http://127.0.0.1:1/api/tip", "", "0.01"))
            .await
            .unwrap_err();
        assert!(matches!(err, TipError::GatedUnavailable(_)), "{err}");
    }
}
