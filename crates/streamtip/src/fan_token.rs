use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::Provider;

use crate::tip_jar::confirmed;
use crate::{IFanToken, TipError};

/// Static metadata of a deployed fan token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
}

pub async fn token_info<P: Provider>(provider: &P, token: Address) -> Result<TokenInfo, TipError> {
    let contract = IFanToken::new(token, provider);
    let call_err = |what: &str, e: alloy::contract::Error| {
        TipError::Chain(format!("{what}() failed on {token}: {e}"))
    };

    let name = contract.name().call().await.map_err(|e| call_err("name", e))?;
    let symbol = contract
        .symbol()
        .call()
        .await
        .map_err(|e| call_err("symbol", e))?;
    let decimals = contract
        .decimals()
        .call()
        .await
        .map_err(|e| call_err("decimals", e))?;
    let total_supply = contract
        .totalSupply()
        .call()
        .await
        .map_err(|e| call_err("totalSupply", e))?;

    Ok(TokenInfo {
        address: token,
        name,
        symbol,
        decimals,
        total_supply,
    })
}

pub async fn balance_of<P: Provider>(
    provider: &P,
    token: Address,
    owner: Address,
) -> Result<U256, TipError> {
    IFanToken::new(token, provider)
        .balanceOf(owner)
        .call()
        .await
        .map_err(|e| TipError::Chain(format!("balanceOf failed: {e}")))
}

/// `transfer(to, amount)` from the provider's wallet. Returns the transaction hash.
pub async fn transfer<P: Provider>(
    provider: &P,
    token: Address,
    to: Address,
    amount: U256,
) -> Result<TxHash, TipError> {
    let pending = IFanToken::new(token, provider)
        .transfer(to, amount)
        .send()
        .await
        .map_err(|e| TipError::Chain(format!("transfer send failed: {e}")))?;

    let receipt = pending
        .get_receipt()
        .await
        .map_err(|e| TipError::Chain(format!("transfer receipt failed: {e}")))?;
    confirmed(&receipt, "transfer")
}

/// Owner-only `mint(to, amount)`.
pub async fn mint<P: Provider>(
    provider: &P,
    token: Address,
    to: Address,
    amount: U256,
) -> Result<TxHash, TipError> {
    let pending = IFanToken::new(token, provider)
        .mint(to, amount)
        .send()
        .await
        .map_err(|e| TipError::Chain(format!("mint send failed: {e}")))?;

    let receipt = pending
        .get_receipt()
        .await
        .map_err(|e| TipError::Chain(format!("mint receipt failed: {e}")))?;
    confirmed(&receipt, "mint")
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;
    use alloy::providers::ProviderBuilder;
    use alloy::sol_types::SolValue;
    use alloy::transports::mock::Asserter;

    const TOKEN: Address = Address::repeat_byte(0x5f);
    const HOLDER: Address = Address::repeat_byte(0x07);

    fn returns<T: SolValue>(value: T) -> Bytes {
        Bytes::from((value,).abi_encode_params())
    }

    #[tokio::test]
    async fn token_info_reads_metadata() {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::default().connect_mocked_client(asserter.clone());

        let supply = U256::from(1_000_000u64) * U256::from(10u64).pow(U256::from(18u64));
        asserter.push_success(&returns("Fan Club".to_string()));
        asserter.push_success(&returns("FAN".to_string()));
        asserter.push_success(&returns(U256::from(18u8)));
        asserter.push_success(&returns(supply));

        let info = token_info(&provider, TOKEN).await.unwrap();
        assert_eq!(
            info,
            TokenInfo {
                address: TOKEN,
                name: "Fan Club".to_string(),
                symbol: "FAN".to_string(),
                decimals: 18,
                total_supply: supply,
            }
        );
    }

    #[tokio::test]
    async fn balance_of_holder() {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::default().connect_mocked_client(asserter.clone());

        asserter.push_success(&returns(U256::from(250u64)));
        assert_eq!(
            balance_of(&provider, TOKEN, HOLDER).await.unwrap(),
            U256::from(250u64)
        );
    }

    #[tokio::test]
    async fn failed_read_names_the_call() {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::default().connect_mocked_client(asserter.clone());

        asserter.push_success(&returns("Fan Club".to_string()));
        asserter.push_failure_msg("execution reverted");
        match token_info(&provider, TOKEN).await {
            Err(TipError::Chain(msg)) => assert!(msg.starts_with("symbol()"), "{msg}"),
            other => panic!("expected Chain error, got {other:?}"),
        }
    }
}
