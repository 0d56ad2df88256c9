//! Tip jar contract client.
//!
//! All input checks run in [`prepare_tip`] before a provider is built, so a
//! missing wallet, a missing contract address, a bad amount or an over-long
//! message never reaches the RPC node. Chain transactions are awaited without
//! a deadline.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;

use crate::amount::{format_units, parse_amount};
use crate::{ChainConfig, TipError, ITipJar, MAX_MESSAGE_LEN};

/// A tip that passed validation and is ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTip {
    pub contract: Address,
    pub message: String,
    pub amount_wei: U256,
}

/// Decoded `TipReceived` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipEvent {
    pub from: Address,
    pub amount: U256,
    pub message: String,
}

/// Receipt of a confirmed tip transaction.
#[derive(Debug, Clone)]
pub struct TipReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub amount_wei: U256,
    pub message: String,
    pub explorer_url: String,
    pub event: Option<TipEvent>,
}

impl TipReceipt {
    pub fn amount_display(&self, decimals: u32) -> String {
        format_units(self.amount_wei, decimals)
    }
}

/// Reject a message longer than [`MAX_MESSAGE_LEN`] characters.
pub fn check_message(message: &str) -> Result<(), TipError> {
    let len = message.chars().count();
    if len > MAX_MESSAGE_LEN {
        return Err(TipError::Validation(format!(
            "message is {len} characters, the limit is {MAX_MESSAGE_LEN}"
        )));
    }
    Ok(())
}

/// Validate a direct tip. Checks run in order: wallet, contract, amount, message.
pub fn prepare_tip(
    has_wallet: bool,
    contract: Option<Address>,
    message: &str,
    amount: &str,
    decimals: u32,
) -> Result<PreparedTip, TipError> {
    if !has_wallet {
        return Err(TipError::NoWallet);
    }
    let contract = contract.ok_or_else(|| {
        TipError::Validation("tip jar contract address is not configured".to_string())
    })?;
    let amount_wei = parse_amount(amount, decimals)?;
    check_message(message)?;

    Ok(PreparedTip {
        contract,
        message: message.to_string(),
        amount_wei,
    })
}

fn rpc_url(config: &ChainConfig) -> Result<Url, TipError> {
    config
        .rpc_url
        .parse()
        .map_err(|e| TipError::Chain(format!("invalid RPC URL '{}': {e}", config.rpc_url)))
}

/// Read-only provider for the configured RPC node.
pub fn read_provider(config: &ChainConfig) -> Result<impl Provider + Clone, TipError> {
    Ok(ProviderBuilder::new().connect_http(rpc_url(config)?))
}

/// Signing provider for the configured RPC node.
pub fn wallet_provider(
    config: &ChainConfig,
    signer: &PrivateKeySigner,
) -> Result<impl Provider + Clone, TipError> {
    Ok(ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer.clone()))
        .connect_http(rpc_url(config)?))
}

/// Validate, sign and submit `tip(message)` with `amount` CHZ attached.
pub async fn submit_tip(
    config: &ChainConfig,
    signer: Option<&PrivateKeySigner>,
    contract: Option<Address>,
    message: &str,
    amount: &str,
) -> Result<TipReceipt, TipError> {
    let prepared = prepare_tip(
        signer.is_some(),
        contract,
        message,
        amount,
        config.native_decimals,
    )?;
    let signer = signer.ok_or(TipError::NoWallet)?;

    tracing::info!(
        contract = %prepared.contract,
        from = %signer.address(),
        amount_wei = %prepared.amount_wei,
        "Submitting tip"
    );

    let provider = wallet_provider(config, signer)?;
    submit_prepared(&provider, config, &prepared).await
}

/// Submit an already validated tip through `provider` and wait for its receipt.
pub async fn submit_prepared<P: Provider>(
    provider: &P,
    config: &ChainConfig,
    tip: &PreparedTip,
) -> Result<TipReceipt, TipError> {
    let jar = ITipJar::new(tip.contract, provider);
    let pending = jar
        .tip(tip.message.clone())
        .value(tip.amount_wei)
        .send()
        .await
        .map_err(|e| TipError::Chain(format!("tip send failed: {e}")))?;

    let receipt = pending
        .get_receipt()
        .await
        .map_err(|e| TipError::Chain(format!("tip receipt failed: {e}")))?;

    let tip_receipt = tip_receipt(&receipt, config, tip)?;
    tracing::info!(
        tx = %tip_receipt.transaction_hash,
        block = ?tip_receipt.block_number,
        "Tip confirmed"
    );
    Ok(tip_receipt)
}

/// Turn a mined `tip` transaction into a [`TipReceipt`]; a reverted one is an error.
pub fn tip_receipt(
    receipt: &TransactionReceipt,
    config: &ChainConfig,
    tip: &PreparedTip,
) -> Result<TipReceipt, TipError> {
    let transaction_hash = confirmed(receipt, "tip")?;

    let event = receipt.inner.logs().iter().find_map(|log| {
        log.log_decode::<ITipJar::TipReceived>().ok().map(|decoded| {
            let data = decoded.inner.data;
            TipEvent {
                from: data.from,
                amount: data.amount,
                message: data.message,
            }
        })
    });

    Ok(TipReceipt {
        transaction_hash,
        block_number: receipt.block_number,
        amount_wei: tip.amount_wei,
        message: tip.message.clone(),
        explorer_url: config.tx_url(transaction_hash),
        event,
    })
}

/// Transaction hash of a successful receipt, or `Chain` if it reverted.
pub fn confirmed(receipt: &TransactionReceipt, what: &str) -> Result<TxHash, TipError> {
    if !receipt.status() {
        return Err(TipError::Chain(format!(
            "{what} transaction {} reverted",
            receipt.transaction_hash
        )));
    }
    Ok(receipt.transaction_hash)
}

/// Owner-only payout of the whole jar balance to `to`.
pub async fn withdraw<P: Provider>(
    provider: &P,
    contract: Address,
    to: Address,
) -> Result<TxHash, TipError> {
    let jar = ITipJar::new(contract, provider);
    let pending = jar
        .withdraw(to)
        .send()
        .await
        .map_err(|e| TipError::Chain(format!("withdraw send failed: {e}")))?;

    let receipt = pending
        .get_receipt()
        .await
        .map_err(|e| TipError::Chain(format!("withdraw receipt failed: {e}")))?;
    confirmed(&receipt, "withdraw")
}

pub async fn owner<P: Provider>(provider: &P, contract: Address) -> Result<Address, TipError> {
    ITipJar::new(contract, provider)
        .owner()
        .call()
        .await
        .map_err(|e| TipError::Chain(format!("owner() failed: {e}")))
}

/// Native balance held by the jar.
pub async fn balance<P: Provider>(provider: &P, contract: Address) -> Result<U256, TipError> {
    provider
        .get_balance(contract)
        .await
        .map_err(|e| TipError::Chain(format!("balance query failed: {e}")))
}
