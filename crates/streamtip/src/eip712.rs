//! EIP-712 typed-data signing for `exact` scheme payment proofs.
//!
//! - Building the domain for a challenge ([`payment_domain`])
//! - Recovering a signer with EIP-2 malleability protection ([`recover_signer`])
//! - Random nonces ([`random_nonce`]) and signature hex encoding ([`encode_signature_hex`])

use alloy::primitives::{Address, FixedBytes, Signature, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};
use std::borrow::Cow;

use crate::{ChainConfig, PaymentRequirements, TipError, TransferWithAuthorization};

/// Build the EIP-712 domain for a challenge entry.
///
/// The domain name/version come from the challenge's `extra` when present,
/// otherwise from the chain config. The verifying contract is the asset.
pub fn payment_domain(config: &ChainConfig, requirements: &PaymentRequirements) -> Eip712Domain {
    let (name, version) = requirements.eip712_domain_hint().unwrap_or_else(|| {
        (
            config.eip712_domain_name.clone(),
            config.eip712_domain_version.clone(),
        )
    });
    Eip712Domain {
        name: Some(Cow::Owned(name)),
        version: Some(Cow::Owned(version)),
        chain_id: Some(U256::from(config.chain_id)),
        verifying_contract: Some(requirements.asset),
        salt: None,
    }
}

pub fn signing_hash(auth: &TransferWithAuthorization, domain: &Eip712Domain) -> B256 {
    auth.eip712_signing_hash(domain)
}

/// secp256k1 curve order N / 2. Signatures with s above this are malleable (EIP-2).
const SECP256K1_N_DIV_2: U256 = U256::from_limbs([
    0xBFD25E8CD0364140,
    0xBAAEDCE6AF48A03B,
    0xFFFFFFFFFFFFFFFE,
    0x7FFFFFFFFFFFFFFF,
]);

/// Recover the address that signed `auth` under `domain`. Rejects high-s signatures.
pub fn recover_signer(
    auth: &TransferWithAuthorization,
    signature_bytes: &[u8],
    domain: &Eip712Domain,
) -> Result<Address, TipError> {
    if signature_bytes.len() != 65 {
        return Err(TipError::Signature(format!(
            "signature must be 65 bytes, got {}",
            signature_bytes.len()
        )));
    }

    let sig = Signature::from_raw(signature_bytes)
        .map_err(|e| TipError::Signature(format!("invalid signature: {e}")))?;

    if sig.s() > SECP256K1_N_DIV_2 {
        return Err(TipError::Signature(
            "high-s signature rejected (EIP-2 malleability)".to_string(),
        ));
    }

    let hash = signing_hash(auth, domain);
    sig.recover_address_from_prehash(&hash)
        .map_err(|e| TipError::Signature(format!("recovery failed: {e}")))
}

/// Random 32-byte nonce (keccak256 of 32 bytes from the OS CSPRNG).
pub fn random_nonce() -> FixedBytes<32> {
    use alloy::primitives::keccak256;
    let mut bytes = [0u8; 32];
    rand::fill(&mut bytes);
    keccak256(bytes)
}

/// Encode a signature as 0x-prefixed hex (65 bytes, v = 27/28).
pub fn encode_signature_hex(sig: &Signature) -> String {
    format!("0x{}", alloy::hex::encode(sig.as_bytes()))
}
