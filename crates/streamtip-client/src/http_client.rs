use alloy::primitives::U256;
use base64::Engine;
use reqwest::StatusCode;
use streamtip::{
    PaymentPayload, PaymentRequiredBody, PaymentRequirements, PaymentResponse, SchemeClient,
    TipError, PAYMENT_HEADER, PAYMENT_RESPONSE_HEADER,
};

/// Header identifying the client application to the tip server.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Final answer of a gated request.
#[derive(Debug, Clone)]
pub struct GatedResponse {
    pub body: serde_json::Value,
    /// Decoded `X-PAYMENT-RESPONSE`, when the server sent one.
    pub settlement: Option<PaymentResponse>,
}

/// HTTP client for x402 payment-gated endpoints.
///
/// Sends the request, answers a 402 challenge with a signed payment in the
/// `X-PAYMENT` header, and retries exactly once.
pub struct X402Client<S: SchemeClient> {
    http: reqwest::Client,
    scheme: S,
    client_id: String,
}

/// Build the shared reqwest client: bounded timeout, no redirects.
pub fn build_http_client() -> Result<reqwest::Client, TipError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| TipError::Http(format!("failed to build HTTP client: {e}")))
}

impl<S: SchemeClient> X402Client<S> {
    pub fn with_http_client(scheme: S, http: reqwest::Client, client_id: impl Into<String>) -> Self {
        Self {
            http,
            scheme,
            client_id: client_id.into(),
        }
    }

    /// POST `body` to `url`, paying at most `max_payment` base units if challenged.
    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        max_payment: Option<U256>,
    ) -> Result<GatedResponse, TipError> {
        let resp = self.send(url, body, None).await?;
        if resp.status() != StatusCode::PAYMENT_REQUIRED {
            return finish(url, resp).await;
        }

        let challenge: PaymentRequiredBody = resp
            .json()
            .await
            .map_err(|e| TipError::Facilitator(format!("unreadable 402 challenge: {e}")))?;
        let requirements = self.select(&challenge)?;

        if let Some(cap) = max_payment {
            let required = requirements.max_amount_required.parse::<U256>().map_err(|e| {
                TipError::Facilitator(format!(
                    "invalid maxAmountRequired '{}': {e}",
                    requirements.max_amount_required
                ))
            })?;
            if required > cap {
                return Err(TipError::PaymentRejected(format!(
                    "server asks for {required} base units, tip is {cap}"
                )));
            }
        }

        let payload = self
            .scheme
            .create_payment_payload(challenge.x402_version, requirements)
            .await?;
        let encoded = encode_payment(&payload)?;

        tracing::debug!(
            url,
            payer = %self.scheme.payer(),
            pay_to = %requirements.pay_to,
            amount = %requirements.max_amount_required,
            "Retrying with payment"
        );

        let resp = self.send(url, body, Some(&encoded)).await?;
        if resp.status() == StatusCode::PAYMENT_REQUIRED {
            let detail = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or_else(|| "payment was not accepted".to_string());
            return Err(TipError::PaymentRejected(detail));
        }
        finish(url, resp).await
    }

    fn select<'a>(
        &self,
        challenge: &'a PaymentRequiredBody,
    ) -> Result<&'a PaymentRequirements, TipError> {
        challenge
            .accepts
            .iter()
            .find(|r| r.scheme == self.scheme.scheme() && r.network == self.scheme.network())
            .ok_or_else(|| {
                let offered: Vec<String> = challenge
                    .accepts
                    .iter()
                    .map(|r| format!("{}@{}", r.scheme, r.network))
                    .collect();
                TipError::UnsupportedScheme(format!(
                    "need {}@{}, server offers {offered:?}",
                    self.scheme.scheme(),
                    self.scheme.network()
                ))
            })
    }

    async fn send(
        &self,
        url: &str,
        body: &serde_json::Value,
        payment: Option<&str>,
    ) -> Result<reqwest::Response, TipError> {
        let mut req = self
            .http
            .post(url)
            .header(CLIENT_ID_HEADER, &self.client_id)
            .json(body);
        if let Some(payment) = payment {
            req = req.header(PAYMENT_HEADER, payment);
        }
        req.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                TipError::GatedUnavailable(format!("cannot reach {url}: {e}"))
            } else {
                TipError::Http(format!("request to {url} failed: {e}"))
            }
        })
    }
}

async fn finish(url: &str, resp: reqwest::Response) -> Result<GatedResponse, TipError> {
    let status = resp.status();
    let settlement = resp
        .headers()
        .get(PAYMENT_RESPONSE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(PaymentResponse::from_header);

    let text = resp
        .text()
        .await
        .map_err(|e| TipError::Http(format!("failed to read response: {e}")))?;
    let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));

    if status == StatusCode::NOT_FOUND || status == StatusCode::METHOD_NOT_ALLOWED {
        return Err(TipError::GatedUnavailable(format!("{url} answered {status}")));
    }
    if status.is_success() {
        return Ok(GatedResponse { body, settlement });
    }
    if status.is_server_error() {
        return Err(TipError::Facilitator(
            error_message(&body).unwrap_or_else(|| status.to_string()),
        ));
    }
    if status == StatusCode::BAD_REQUEST {
        return Err(TipError::Validation(
            error_message(&body).unwrap_or_else(|| "bad request".to_string()),
        ));
    }
    Err(TipError::Http(format!(
        "{url} answered {status}: {}",
        error_message(&body).unwrap_or_default()
    )))
}

/// Human-readable error from a JSON error body (`message` preferred over `error`).
fn error_message(body: &serde_json::Value) -> Option<String> {
    match body {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
    }
}

/// Base64-encode a payment payload for the `X-PAYMENT` header.
pub fn encode_payment(payload: &PaymentPayload) -> Result<String, TipError> {
    let json = serde_json::to_vec(payload)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json))
}

/// Decode an `X-PAYMENT` header value.
pub fn decode_payment(encoded: &str) -> Result<PaymentPayload, TipError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| TipError::PaymentRejected(format!("invalid base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TipError::PaymentRejected(format!("invalid payment JSON: {e}")))
}
