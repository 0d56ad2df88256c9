//! Assembling settlement parameters and interpreting the facilitator's answer.

use serde::Deserialize;
use streamtip::tip_jar::check_message;
use streamtip::{format_units, parse_amount, SettlementResult, TipError, TIP_PATH};

use crate::config::ServerConfig;
use crate::facilitator::{FacilitatorSettlement, RouteConfig, SettlementRequest};

pub const TIP_MIME_TYPE: &str = "application/json";
pub const TIP_MAX_TIMEOUT_SECONDS: u64 = 300;

/// Body of `POST /api/tip`. Both fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TipBody {
    #[serde(default)]
    pub message: Option<String>,
    /// String or number; anything else is rejected by [`TipBody::validate`].
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
}

/// A tip body that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTip {
    pub message: String,
    pub amount: String,
}

impl TipBody {
    /// Empty input means `{}`.
    pub fn parse(bytes: &[u8]) -> Result<Self, TipError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(bytes)
            .map_err(|e| TipError::Validation(format!("malformed JSON body: {e}")))
    }

    pub fn validate(&self, default_amount: &str, decimals: u32) -> Result<ValidTip, TipError> {
        let amount = match &self.amount {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(TipError::InvalidAmount(format!(
                    "amount must be a string or number, got {other}"
                )))
            }
        };
        let raw = if amount.is_empty() {
            default_amount
        } else {
            amount.as_str()
        };
        // Forward the canonical rendering, never the caller's spelling.
        let amount = format_units(parse_amount(raw, decimals)?, decimals);

        let message = self.message.clone().unwrap_or_default();
        check_message(&message)?;
        Ok(ValidTip { message, amount })
    }
}

/// `<origin>/api/tip`, else `https://<host>/api/tip`, else the bare path.
pub fn resource_url(origin: Option<&str>, host: Option<&str>) -> String {
    match (origin.filter(|o| !o.is_empty()), host.filter(|h| !h.is_empty())) {
        (Some(origin), _) => format!("{}{TIP_PATH}", origin.trim_end_matches('/')),
        (None, Some(host)) => format!("https://{host}{TIP_PATH}"),
        (None, None) => TIP_PATH.to_string(),
    }
}

pub fn description(message: &str) -> String {
    if message.is_empty() {
        "Tip to streamer".to_string()
    } else {
        format!("Tip to streamer: {message}")
    }
}

pub fn build_request(
    config: &ServerConfig,
    tip: &ValidTip,
    resource_url: String,
    payment_data: Option<String>,
) -> SettlementRequest {
    SettlementRequest {
        resource_url,
        method: "POST".to_string(),
        payment_data,
        pay_to: config.pay_to,
        network: config.chain.network.clone(),
        price: tip.amount.clone(),
        route_config: RouteConfig {
            description: description(&tip.message),
            mime_type: TIP_MIME_TYPE.to_string(),
            max_timeout_seconds: TIP_MAX_TIMEOUT_SECONDS,
        },
    }
}

/// Map a facilitator verdict onto the three settlement outcomes.
pub fn interpret(settlement: &FacilitatorSettlement) -> SettlementResult {
    match settlement.status {
        200 => match settlement
            .transaction_hash
            .as_deref()
            .filter(|tx| !tx.is_empty())
        {
            Some(tx) => SettlementResult::success(tx),
            None => SettlementResult::failed("settlement succeeded without a transaction reference"),
        },
        status @ 400..=499 => {
            SettlementResult::payment_required(status, settlement.response_body.clone())
        }
        status => SettlementResult::failed(
            settlement
                .response_body
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("facilitator returned status {status}")),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamtip::{SettlementStatus, MAX_MESSAGE_LEN, NATIVE_DECIMALS};

    #[test]
    fn resource_url_precedence() {
        assert_eq!(
            resource_url(Some("https://example.com"), Some("other.org")),
            "https://example.com/api/tip"
        );
        assert_eq!(
            resource_url(None, Some("example.com")),
            "https://example.com/api/tip"
        );
        assert_eq!(resource_url(None, None), "/api/tip");
        assert_eq!(resource_url(Some(""), None), "/api/tip");
    }

    #[test]
    fn description_includes_message_when_present() {
        assert_eq!(description(""), "Tip to streamer");
        assert_eq!(description("gg"), "Tip to streamer: gg");
    }

    #[test]
    fn body_defaults_and_validation() {
        let tip = TipBody::parse(b"").unwrap().validate("0.01", NATIVE_DECIMALS).unwrap();
        assert_eq!(tip.amount, "0.01");
        assert_eq!(tip.message, "");

        let tip = TipBody::parse(br#"{"amount":"","message":"hi"}"#)
            .unwrap()
            .validate("0.01", NATIVE_DECIMALS)
            .unwrap();
        assert_eq!(tip.amount, "0.01");

        let tip = TipBody::parse(br#"{"amount":0.5}"#)
            .unwrap()
            .validate("0.01", NATIVE_DECIMALS)
            .unwrap();
        assert_eq!(tip.amount, "0.5");

        for (spelled, canonical) in [("+0.5", "0.5"), (".5", "0.5"), (" 2.50 ", "2.5"), ("3.", "3")] {
            let body = serde_json::json!({ "amount": spelled }).to_string();
            let tip = TipBody::parse(body.as_bytes())
                .unwrap()
                .validate("0.01", NATIVE_DECIMALS)
                .unwrap();
            assert_eq!(tip.amount, canonical, "{spelled}");
        }

        assert!(TipBody::parse(b"{not json").is_err());
        for body in [
            r#"{"amount":"0"}"#.to_string(),
            r#"{"amount":"-1"}"#.to_string(),
            r#"{"amount":true}"#.to_string(),
            format!(r#"{{"message":"{}"}}"#, "x".repeat(MAX_MESSAGE_LEN + 1)),
        ] {
            let err = TipBody::parse(body.as_bytes())
                .unwrap()
                .validate("0.01", NATIVE_DECIMALS)
                .unwrap_err();
            assert!(err.is_validation(), "{body}: {err}");
        }
    }

    fn verdict(status: u16, tx: Option<&str>) -> FacilitatorSettlement {
        FacilitatorSettlement {
            status,
            response_body: serde_json::json!({"error": "nope"}),
            transaction_hash: tx.map(str::to_string),
            payer: None,
        }
    }

    #[test]
    fn interpretation() {
        assert_eq!(
            interpret(&verdict(200, Some("0xabc"))),
            SettlementResult::success("0xabc")
        );
        assert!(matches!(
            interpret(&verdict(200, None)).status,
            SettlementStatus::Failed { .. }
        ));
        assert!(matches!(
            interpret(&verdict(200, Some(""))).status,
            SettlementStatus::Failed { .. }
        ));
        assert_eq!(interpret(&verdict(402, None)).http_status(), 402);
        assert_eq!(interpret(&verdict(403, None)).http_status(), 403);
        let failed = interpret(&verdict(502, None));
        assert_eq!(failed.http_status(), 500);
        assert_eq!(failed.error_detail(), Some("nope"));
    }
}
