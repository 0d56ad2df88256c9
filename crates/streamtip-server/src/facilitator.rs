//! Client side of the facilitator's `/settle` call.

use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use streamtip::hmac::{sign_body, FACILITATOR_AUTH_HEADER};
use streamtip::TipError;

/// Per-route settlement options forwarded to the facilitator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    pub description: String,
    pub mime_type: String,
    pub max_timeout_seconds: u64,
}

/// One settlement attempt, as sent to the facilitator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRequest {
    pub resource_url: String,
    pub method: String,
    /// Raw `X-PAYMENT` header, absent on the first (unpaid) attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    pub pay_to: Address,
    /// CAIP-2 network, e.g. `eip155:88882`.
    pub network: String,
    /// Decimal CHZ amount.
    pub price: String,
    pub route_config: RouteConfig,
}

/// Facilitator verdict before interpretation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorSettlement {
    pub status: u16,
    #[serde(default)]
    pub response_body: serde_json::Value,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub payer: Option<Address>,
}

#[async_trait]
pub trait Facilitator: Send + Sync {
    async fn settle(&self, request: &SettlementRequest) -> Result<FacilitatorSettlement, TipError>;
}

/// Facilitator reached over HTTP with HMAC-authenticated requests.
pub struct HttpFacilitator {
    http: reqwest::Client,
    settle_url: String,
    secret: Vec<u8>,
    timeout: Duration,
}

impl HttpFacilitator {
    pub fn new(base_url: &str, secret: &[u8], timeout: Duration) -> Result<Self, TipError> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TipError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            settle_url: format!("{}/settle", base_url.trim_end_matches('/')),
            secret: secret.to_vec(),
            timeout,
        })
    }

    pub fn settle_url(&self) -> &str {
        &self.settle_url
    }
}

#[async_trait]
impl Facilitator for HttpFacilitator {
    async fn settle(&self, request: &SettlementRequest) -> Result<FacilitatorSettlement, TipError> {
        let body = serde_json::to_vec(request)?;
        let signature = sign_body(&self.secret, &body);

        let resp = self
            .http
            .post(&self.settle_url)
            .header("Content-Type", "application/json")
            .header(FACILITATOR_AUTH_HEADER, signature)
            .timeout(self.timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TipError::Facilitator(format!(
                        "settlement timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    TipError::Facilitator(format!("facilitator request failed: {e}"))
                }
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TipError::Facilitator(
                "facilitator rejected our credentials".to_string(),
            ));
        }
        if status.is_server_error() {
            return Err(TipError::Facilitator(format!("facilitator answered {status}")));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| TipError::Facilitator(format!("failed to read facilitator response: {e}")))?;

        if status.is_client_error() {
            // A bare 4xx carries the challenge itself.
            let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
            return Ok(FacilitatorSettlement {
                status: status.as_u16(),
                response_body: body,
                transaction_hash: None,
                payer: None,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| TipError::Facilitator(format!("invalid facilitator response: {e}")))
    }
}
