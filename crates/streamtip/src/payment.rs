use alloy::primitives::{Address, FixedBytes};
use serde::{Deserialize, Serialize};

/// A single entry in the `accepts` array of a 402 challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    /// Amount in base units, as a decimal string.
    pub max_amount_required: String,
    pub resource: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub pay_to: Address,
    pub max_timeout_seconds: u64,
    pub asset: Address,
    /// Scheme-specific extras; for `exact` this names the EIP-712 domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl PaymentRequirements {
    /// EIP-712 domain `(name, version)` advertised in `extra`, if any.
    pub fn eip712_domain_hint(&self) -> Option<(String, String)> {
        let extra = self.extra.as_ref()?;
        let name = extra.get("name")?.as_str()?;
        let version = extra.get("version")?.as_str()?;
        Some((name.to_string(), version.to_string()))
    }
}

/// The 402 response body. Facilitator-defined; only these fields are read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredBody {
    pub x402_version: u32,
    #[serde(default)]
    pub accepts: Vec<PaymentRequirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The signed transfer authorization of the `exact` scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactAuthorization {
    pub from: Address,
    pub to: Address,
    pub value: String,
    pub valid_after: String,
    pub valid_before: String,
    pub nonce: FixedBytes<32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExactPayload {
    pub signature: String,
    pub authorization: ExactAuthorization,
}

/// Wire-format payment proof (sent in the `X-PAYMENT` header, base64-encoded JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: ExactPayload,
}
