use alloy::primitives::Address;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::TipError;

/// Settlement summary carried in the `X-PAYMENT-RESPONSE` header of a paid response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub success: bool,
    pub transaction: String,
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<Address>,
}

impl PaymentResponse {
    pub fn to_header(&self) -> Result<String, TipError> {
        let json = serde_json::to_vec(self)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }

    /// Decode a header value: base64 JSON first, plain JSON as a fallback.
    pub fn from_header(value: &str) -> Option<Self> {
        base64::engine::general_purpose::STANDARD
            .decode(value)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .or_else(|| serde_json::from_str(value).ok())
    }
}

/// Outcome of one settlement attempt.
///
/// Each variant carries only what its status allows: a transaction reference
/// exists only on success, an error detail only on failure.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementStatus {
    Success {
        transaction: String,
    },
    /// The payer must (re)pay. `status` is the facilitator's 4xx, normally 402.
    PaymentRequired {
        status: u16,
        challenge: serde_json::Value,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettlementResult {
    pub status: SettlementStatus,
}

impl SettlementResult {
    pub fn success(transaction: impl Into<String>) -> Self {
        Self {
            status: SettlementStatus::Success {
                transaction: transaction.into(),
            },
        }
    }

    pub fn payment_required(status: u16, challenge: serde_json::Value) -> Self {
        Self {
            status: SettlementStatus::PaymentRequired { status, challenge },
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: SettlementStatus::Failed {
                error: error.into(),
            },
        }
    }

    pub fn transaction_reference(&self) -> Option<&str> {
        match &self.status {
            SettlementStatus::Success { transaction } => Some(transaction),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.status {
            SettlementStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// HTTP status the settlement service answers with.
    pub fn http_status(&self) -> u16 {
        match &self.status {
            SettlementStatus::Success { .. } => 200,
            SettlementStatus::PaymentRequired { status, .. } => *status,
            SettlementStatus::Failed { .. } => 500,
        }
    }
}
