use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use streamtip::{
    eip712::{encode_signature_hex, payment_domain, random_nonce, signing_hash},
    ChainConfig, ExactAuthorization, ExactPayload, PaymentPayload, PaymentRequirements,
    SchemeClient, TipError, TransferWithAuthorization,
};

/// Clock skew tolerated on `validAfter`.
const VALID_AFTER_SKEW_SECS: u64 = 60;

/// Signs `exact` scheme payments: an EIP-712 `TransferWithAuthorization`
/// from the session wallet to the challenge's `payTo`.
pub struct ExactSchemeClient {
    signer: PrivateKeySigner,
    config: ChainConfig,
}

impl ExactSchemeClient {
    pub fn new(signer: PrivateKeySigner, config: ChainConfig) -> Self {
        Self { signer, config }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl SchemeClient for ExactSchemeClient {
    fn scheme(&self) -> &str {
        &self.config.scheme_name
    }

    fn network(&self) -> &str {
        &self.config.network
    }

    fn payer(&self) -> Address {
        self.signer.address()
    }

    async fn create_payment_payload(
        &self,
        x402_version: u32,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentPayload, TipError> {
        if requirements.scheme != self.config.scheme_name {
            return Err(TipError::UnsupportedScheme(requirements.scheme.clone()));
        }
        if requirements.network != self.config.network {
            return Err(TipError::UnsupportedScheme(format!(
                "{} on {} (wallet is on {})",
                requirements.scheme, requirements.network, self.config.network
            )));
        }

        let value = requirements
            .max_amount_required
            .parse::<U256>()
            .map_err(|e| {
                TipError::Facilitator(format!(
                    "invalid maxAmountRequired '{}': {e}",
                    requirements.max_amount_required
                ))
            })?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| TipError::Signature(format!("system time error: {e}")))?
            .as_secs();
        let valid_after = now.saturating_sub(VALID_AFTER_SKEW_SECS);
        let valid_before = now.saturating_add(requirements.max_timeout_seconds);
        let nonce = random_nonce();

        let auth = TransferWithAuthorization {
            from: self.signer.address(),
            to: requirements.pay_to,
            value,
            validAfter: U256::from(valid_after),
            validBefore: U256::from(valid_before),
            nonce,
        };

        let domain = payment_domain(&self.config, requirements);
        let sig = self
            .signer
            .sign_hash_sync(&signing_hash(&auth, &domain))
            .map_err(|e| TipError::Signature(format!("signing failed: {e}")))?;

        Ok(PaymentPayload {
            x402_version,
            scheme: requirements.scheme.clone(),
            network: requirements.network.clone(),
            payload: ExactPayload {
                signature: encode_signature_hex(&sig),
                authorization: ExactAuthorization {
                    from: self.signer.address(),
                    to: requirements.pay_to,
                    value: value.to_string(),
                    valid_after: valid_after.to_string(),
                    valid_before: valid_before.to_string(),
                    nonce,
                },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamtip::eip712::recover_signer;

    fn requirements(network: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".to_string(),
            network: network.to_string(),
            max_amount_required: "10000000000000000".to_string(),
            resource: "http://localhost:3001/api/tip".to_string(),
            description: "Tip to streamer".to_string(),
            mime_type: Some("application/json".to_string()),
            pay_to: Address::with_last_byte(0xaa),
            max_timeout_seconds: 300,
            asset: Address::with_last_byte(0xbb),
            extra: None,
        }
    }

    #[tokio::test]
    async fn signs_recoverable_authorization() {
        let signer = PrivateKeySigner::random();
        let client = ExactSchemeClient::new(signer.clone(), ChainConfig::spicy());
        let req = requirements("eip155:88882");

        let payload = client.create_payment_payload(1, &req).await.unwrap();
        let auth = &payload.payload.authorization;
        assert_eq!(payload.scheme, "exact");
        assert_eq!(auth.from, signer.address());
        assert_eq!(auth.to, req.pay_to);
        assert_eq!(auth.value, "10000000000000000");

        let after: u64 = auth.valid_after.parse().unwrap();
        let before: u64 = auth.valid_before.parse().unwrap();
        assert_eq!(before - after, 300 + VALID_AFTER_SKEW_SECS);

        let typed = TransferWithAuthorization {
            from: auth.from,
            to: auth.to,
            value: auth.value.parse().unwrap(),
            validAfter: U256::from(after),
            validBefore: U256::from(before),
            nonce: auth.nonce,
        };
        let sig = alloy::hex::decode(&payload.payload.signature).unwrap();
        let domain = payment_domain(&ChainConfig::spicy(), &req);
        assert_eq!(recover_signer(&typed, &sig, &domain).unwrap(), signer.address());
    }

    #[tokio::test]
    async fn rejects_other_network_and_scheme() {
        let client = ExactSchemeClient::new(PrivateKeySigner::random(), ChainConfig::spicy());
        assert!(matches!(
            client.create_payment_payload(1, &requirements("eip155:88888")).await,
            Err(TipError::UnsupportedScheme(_))
        ));

        let mut req = requirements("eip155:88882");
        req.scheme = "upto".to_string();
        assert!(matches!(
            client.create_payment_payload(1, &req).await,
            Err(TipError::UnsupportedScheme(_))
        ));
    }

    #[tokio::test]
    async fn rejects_malformed_amount() {
        let client = ExactSchemeClient::new(PrivateKeySigner::random(), ChainConfig::spicy());
        let mut req = requirements("eip155:88882");
        req.max_amount_required = "0.01".to_string();
        assert!(matches!(
            client.create_payment_payload(1, &req).await,
            Err(TipError::Facilitator(_))
        ));
    }
}
