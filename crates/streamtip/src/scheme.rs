//! Client-side x402 scheme trait.
//!
//! A [`SchemeClient`] turns one entry of a 402 challenge into a signed
//! [`PaymentPayload`]. See `streamtip_client::ExactSchemeClient` for the
//! EIP-712 implementation used by the tip sender.

use crate::error::TipError;
use crate::payment::{PaymentPayload, PaymentRequirements};
use alloy::primitives::Address;

pub trait SchemeClient: Send + Sync {
    /// Scheme name this client can pay (matched against `accepts[].scheme`).
    fn scheme(&self) -> &str;

    /// CAIP-2 network this client signs for.
    fn network(&self) -> &str;

    /// Address the payment is drawn from.
    fn payer(&self) -> Address;

    /// Create a signed payment payload for the given requirements.
    fn create_payment_payload(
        &self,
        x402_version: u32,
        requirements: &PaymentRequirements,
    ) -> impl std::future::Future<Output = Result<PaymentPayload, TipError>> + Send;
}
