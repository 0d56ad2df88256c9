use alloy::primitives::{address, U256};
use base64::Engine;
use streamtip::{
    parse_amount, ExactAuthorization, ExactPayload, PaymentPayload, PaymentRequiredBody,
    PaymentResponse, NATIVE_DECIMALS, X402_VERSION,
};

const CHALLENGE: &str = r#"{
    "x402Version": 1,
    "error": "X-PAYMENT header is required",
    "accepts": [{
        "scheme": "exact",
        "network": "eip155:88882",
        "maxAmountRequired": "10000000000000000",
        "resource": "https://tips.example.com/api/tip",
        "description": "Tip to streamer: gg",
        "mimeType": "application/json",
        "payTo": "0x00000000000000000000000000000000000000aa",
        "maxTimeoutSeconds": 300,
        "asset": "0x00000000000000000000000000000000000000bb",
        "extra": {"name": "CHZ", "version": "1"}
    }]
}"#;

#[test]
fn parses_facilitator_challenge() {
    let body: PaymentRequiredBody = serde_json::from_str(CHALLENGE).unwrap();
    assert_eq!(body.x402_version, X402_VERSION);
    assert_eq!(body.error.as_deref(), Some("X-PAYMENT header is required"));

    let req = &body.accepts[0];
    assert_eq!(req.scheme, "exact");
    assert_eq!(req.pay_to, address!("00000000000000000000000000000000000000aa"));
    assert_eq!(
        req.max_amount_required.parse::<U256>().unwrap(),
        parse_amount("0.01", NATIVE_DECIMALS).unwrap()
    );
    assert_eq!(
        req.eip712_domain_hint(),
        Some(("CHZ".to_string(), "1".to_string()))
    );
}

#[test]
fn challenge_without_accepts_still_parses() {
    let body: PaymentRequiredBody =
        serde_json::from_str(r#"{"x402Version": 1, "error": "insufficient funds"}"#).unwrap();
    assert!(body.accepts.is_empty());
}

#[test]
fn payment_payload_uses_camel_case_on_the_wire() {
    let payload = PaymentPayload {
        x402_version: X402_VERSION,
        scheme: "exact".to_string(),
        network: "eip155:88882".to_string(),
        payload: ExactPayload {
            signature: "0x00".to_string(),
            authorization: ExactAuthorization {
                from: address!("00000000000000000000000000000000000000cc"),
                to: address!("00000000000000000000000000000000000000aa"),
                value: "10000000000000000".to_string(),
                valid_after: "0".to_string(),
                valid_before: "1700000300".to_string(),
                nonce: Default::default(),
            },
        },
    };
    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["x402Version"], 1);
    assert_eq!(json["payload"]["authorization"]["validBefore"], "1700000300");
    assert!(json["payload"]["authorization"].get("valid_before").is_none());
}

#[test]
fn payment_response_header_is_base64_json() {
    let header = base64::engine::general_purpose::STANDARD
        .encode(r#"{"success":true,"transaction":"0xfeed","network":"eip155:88882"}"#);
    let decoded = PaymentResponse::from_header(&header).unwrap();
    assert!(decoded.success);
    assert_eq!(decoded.transaction, "0xfeed");
    assert_eq!(decoded.payer, None);
}
