//! Fan token deployment as an ordered list of strategies.
//!
//! [`FanTokenDeployer`] tries each [`DeployStrategy`] in turn. The first
//! success wins; when every strategy fails the individual failures are
//! returned together in [`DeployError::AllFailed`].

use std::fmt;
use std::path::PathBuf;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::tip_jar::{read_provider, wallet_provider};
use crate::{ChainConfig, TipError};

/// Initial supply in whole tokens when none is given.
pub const DEFAULT_INITIAL_SUPPLY: u64 = 1_000_000;

pub const FAN_TOKEN_DECIMALS: u8 = 18;

/// Constructor arguments of the fan token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub name: String,
    pub symbol: String,
    /// Whole tokens; the contract scales by `decimals`.
    pub initial_supply: U256,
    pub decimals: u8,
}

impl DeployRequest {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            initial_supply: U256::from(DEFAULT_INITIAL_SUPPLY),
            decimals: FAN_TOKEN_DECIMALS,
        }
    }

    pub fn with_initial_supply(mut self, supply: U256) -> Self {
        self.initial_supply = supply;
        self
    }

    fn validate(&self) -> Result<(), DeployError> {
        if self.name.trim().is_empty() {
            return Err(DeployError::InvalidRequest(
                "token name is required".to_string(),
            ));
        }
        if self.symbol.trim().is_empty() {
            return Err(DeployError::InvalidRequest(
                "token symbol is required".to_string(),
            ));
        }
        Ok(())
    }

    /// ABI-encoded `(string, string, uint256, uint8)` constructor arguments.
    /// A `uint8` occupies the same 32-byte word as a `uint256`.
    pub fn constructor_args(&self) -> Vec<u8> {
        (
            self.name.clone(),
            self.symbol.clone(),
            self.initial_supply,
            U256::from(self.decimals),
        )
            .abi_encode_params()
    }
}

/// Everything a strategy may need.
pub struct DeployContext<'a> {
    pub request: &'a DeployRequest,
    pub chain: &'a ChainConfig,
    pub signer: Option<&'a PrivateKeySigner>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    pub address: Address,
    pub strategy: &'static str,
    /// Set only when a new contract was deployed.
    pub transaction_hash: Option<TxHash>,
}

#[derive(Debug, Error)]
pub enum DeployFailure {
    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("no wallet connected")]
    NoWallet,

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("chain error: {0}")]
    Chain(String),
}

/// A failure tagged with the strategy that produced it.
#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: &'static str,
    pub failure: DeployFailure,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.failure)
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid token parameters: {0}")]
    InvalidRequest(String),

    #[error("no deployment strategies configured")]
    NoStrategies,

    #[error("fan token deployment failed ({})", join_failures(.0))]
    AllFailed(Vec<StrategyFailure>),
}

fn join_failures(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<DeployError> for TipError {
    fn from(err: DeployError) -> Self {
        match err {
            DeployError::InvalidRequest(msg) => TipError::Validation(msg),
            other => TipError::Chain(other.to_string()),
        }
    }
}

#[async_trait]
pub trait DeployStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deploy(&self, ctx: &DeployContext<'_>) -> Result<DeployOutcome, DeployFailure>;
}

/// Runs strategies in order until one succeeds.
#[derive(Default)]
pub struct FanTokenDeployer {
    strategies: Vec<Box<dyn DeployStrategy>>,
}

impl FanTokenDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse a configured token when it exists on chain, else deploy from an artifact.
    pub fn standard(existing: Option<Address>, artifact: Option<PathBuf>) -> Self {
        let mut deployer = Self::new();
        if let Some(address) = existing {
            deployer = deployer.with_strategy(ExistingToken { address });
        }
        if let Some(path) = artifact {
            deployer = deployer.with_strategy(ArtifactDeploy { path });
        }
        deployer
    }

    pub fn with_strategy(mut self, strategy: impl DeployStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn deploy(&self, ctx: &DeployContext<'_>) -> Result<DeployOutcome, DeployError> {
        ctx.request.validate()?;
        if self.strategies.is_empty() {
            return Err(DeployError::NoStrategies);
        }

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            match strategy.deploy(ctx).await {
                Ok(outcome) => {
                    tracing::info!(
                        strategy = strategy.name(),
                        address = %outcome.address,
                        symbol = %ctx.request.symbol,
                        "Fan token ready"
                    );
                    return Ok(outcome);
                }
                Err(failure) => {
                    tracing::warn!(strategy = strategy.name(), error = %failure, "Deploy strategy failed");
                    failures.push(StrategyFailure {
                        strategy: strategy.name(),
                        failure,
                    });
                }
            }
        }
        Err(DeployError::AllFailed(failures))
    }
}

/// Use a token that is already deployed at a known address.
pub struct ExistingToken {
    pub address: Address,
}

#[async_trait]
impl DeployStrategy for ExistingToken {
    fn name(&self) -> &'static str {
        "existing-token"
    }

    async fn deploy(&self, ctx: &DeployContext<'_>) -> Result<DeployOutcome, DeployFailure> {
        let provider =
            read_provider(ctx.chain).map_err(|e| DeployFailure::Chain(e.to_string()))?;
        let code = provider
            .get_code_at(self.address)
            .await
            .map_err(|e| DeployFailure::Chain(format!("getCode failed: {e}")))?;
        if code.is_empty() {
            return Err(DeployFailure::NotConfigured(format!(
                "no contract code at {}",
                self.address
            )));
        }
        Ok(DeployOutcome {
            address: self.address,
            strategy: self.name(),
            transaction_hash: None,
        })
    }
}

/// Deploy a compiled artifact (`{abi, bytecode}` JSON) with the request's constructor args.
pub struct ArtifactDeploy {
    pub path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactBytecode {
    Hex(String),
    Object { object: String },
}

#[derive(Deserialize)]
struct Artifact {
    bytecode: ArtifactBytecode,
}

/// Parse artifact JSON and return creation code with constructor args appended.
pub fn deploy_code(artifact_json: &str, request: &DeployRequest) -> Result<Bytes, DeployFailure> {
    let artifact: Artifact = serde_json::from_str(artifact_json)
        .map_err(|e| DeployFailure::Artifact(format!("invalid artifact JSON: {e}")))?;
    let hex = match artifact.bytecode {
        ArtifactBytecode::Hex(s) => s,
        ArtifactBytecode::Object { object } => object,
    };
    let mut code = alloy::hex::decode(hex.trim())
        .map_err(|e| DeployFailure::Artifact(format!("invalid bytecode: {e}")))?;
    if code.is_empty() {
        return Err(DeployFailure::Artifact("artifact bytecode is empty".to_string()));
    }
    code.extend_from_slice(&request.constructor_args());
    Ok(code.into())
}

#[async_trait]
impl DeployStrategy for ArtifactDeploy {
    fn name(&self) -> &'static str {
        "artifact-deploy"
    }

    async fn deploy(&self, ctx: &DeployContext<'_>) -> Result<DeployOutcome, DeployFailure> {
        let signer = ctx.signer.ok_or(DeployFailure::NoWallet)?;
        let json = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DeployFailure::Artifact(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let code = deploy_code(&json, ctx.request)?;

        let provider =
            wallet_provider(ctx.chain, signer).map_err(|e| DeployFailure::Chain(e.to_string()))?;
        let tx = TransactionRequest::default().with_deploy_code(code);
        let receipt = provider
            .send_transaction(tx)
            .await
            .map_err(|e| DeployFailure::Chain(format!("deploy send failed: {e}")))?
            .get_receipt()
            .await
            .map_err(|e| DeployFailure::Chain(format!("deploy receipt failed: {e}")))?;

        if !receipt.status() {
            return Err(DeployFailure::Chain("deployment reverted".to_string()));
        }
        let address = receipt.contract_address.ok_or_else(|| {
            DeployFailure::Chain("receipt has no contract address".to_string())
        })?;

        Ok(DeployOutcome {
            address,
            strategy: self.name(),
            transaction_hash: Some(receipt.transaction_hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed {
        name: &'static str,
        result: Option<Address>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DeployStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn deploy(&self, _ctx: &DeployContext<'_>) -> Result<DeployOutcome, DeployFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.result {
                Some(address) => Ok(DeployOutcome {
                    address,
                    strategy: self.name,
                    transaction_hash: None,
                }),
                None => Err(DeployFailure::NotConfigured(format!("{} unavailable", self.name))),
            }
        }
    }

    fn fixed(name: &'static str, result: Option<Address>) -> (Fixed, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Fixed {
                name,
                result,
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn ctx<'a>(request: &'a DeployRequest, chain: &'a ChainConfig) -> DeployContext<'a> {
        DeployContext {
            request,
            chain,
            signer: None,
        }
    }

    #[tokio::test]
    async fn first_success_wins() {
        let token = Address::repeat_byte(0x07);
        let (a, a_calls) = fixed("a", None);
        let (b, b_calls) = fixed("b", Some(token));
        let (c, c_calls) = fixed("c", Some(Address::ZERO));
        let deployer = FanTokenDeployer::new()
            .with_strategy(a)
            .with_strategy(b)
            .with_strategy(c);

        let request = DeployRequest::new("Fan Club", "FAN");
        let chain = ChainConfig::spicy();
        let outcome = deployer.deploy(&ctx(&request, &chain)).await.unwrap();

        assert_eq!(outcome.address, token);
        assert_eq!(outcome.strategy, "b");
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_failures_are_reported() {
        let (a, _) = fixed("a", None);
        let (b, _) = fixed("b", None);
        let deployer = FanTokenDeployer::new().with_strategy(a).with_strategy(b);

        let request = DeployRequest::new("Fan Club", "FAN");
        let chain = ChainConfig::spicy();
        match deployer.deploy(&ctx(&request, &chain)).await {
            Err(DeployError::AllFailed(failures)) => {
                let names: Vec<_> = failures.iter().map(|f| f.strategy).collect();
                assert_eq!(names, ["a", "b"]);
            }
            other => panic!("expected AllFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn name_and_symbol_checked_before_strategies() {
        let (a, calls) = fixed("a", Some(Address::ZERO));
        let deployer = FanTokenDeployer::new().with_strategy(a);
        let chain = ChainConfig::spicy();

        for request in [DeployRequest::new("", "FAN"), DeployRequest::new("Fan", "  ")] {
            let err = deployer.deploy(&ctx(&request, &chain)).await.unwrap_err();
            assert!(matches!(err, DeployError::InvalidRequest(_)));
            assert!(TipError::from(err).is_validation());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_deployer_errors() {
        let request = DeployRequest::new("Fan", "FAN");
        let chain = ChainConfig::spicy();
        let err = FanTokenDeployer::new()
            .deploy(&ctx(&request, &chain))
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::NoStrategies));
    }

    #[test]
    fn standard_order() {
        let deployer =
            FanTokenDeployer::standard(Some(Address::ZERO), Some(PathBuf::from("FanToken.json")));
        assert_eq!(deployer.strategy_names(), ["existing-token", "artifact-deploy"]);
        assert!(FanTokenDeployer::standard(None, None).strategy_names().is_empty());
    }

    #[test]
    fn deploy_code_appends_constructor_args() {
        let request = DeployRequest::new("Fan Club", "FAN");
        let json = r#"{"abi": [], "bytecode": "0x6080604052"}"#;
        let code = deploy_code(json, &request).unwrap();
        assert_eq!(&code[..5], &[0x60, 0x80, 0x60, 0x40, 0x52]);

        let args = request.constructor_args();
        assert_eq!(&code[5..], args.as_slice());
        // supply word sits third, after the two string offsets
        assert_eq!(U256::from_be_slice(&args[64..96]), U256::from(DEFAULT_INITIAL_SUPPLY));
        assert_eq!(args[127], FAN_TOKEN_DECIMALS);

        let (name, symbol, supply, decimals) =
            <(String, String, U256, U256)>::abi_decode_params(&args).unwrap();
        assert_eq!((name.as_str(), symbol.as_str()), ("Fan Club", "FAN"));
        assert_eq!(supply, U256::from(DEFAULT_INITIAL_SUPPLY));
        assert_eq!(decimals, U256::from(18u8));
    }

    #[test]
    fn deploy_code_accepts_object_bytecode() {
        let request = DeployRequest::new("Fan", "FAN");
        let json = r#"{"bytecode": {"object": "0x00"}}"#;
        assert!(deploy_code(json, &request).is_ok());
    }

    #[test]
    fn deploy_code_rejects_bad_artifacts() {
        let request = DeployRequest::new("Fan", "FAN");
        for json in ["not json", r#"{"abi": []}"#, r#"{"bytecode": "0xzz"}"#, r#"{"bytecode": "0x"}"#] {
            assert!(
                matches!(deploy_code(json, &request), Err(DeployFailure::Artifact(_))),
                "{json}"
            );
        }
    }

    #[tokio::test]
    async fn artifact_deploy_needs_wallet() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"abi": [], "bytecode": "0x6080"}}"#).unwrap();

        let strategy = ArtifactDeploy {
            path: file.path().to_path_buf(),
        };
        let request = DeployRequest::new("Fan", "FAN");
        let chain = ChainConfig::spicy();
        let err = strategy.deploy(&ctx(&request, &chain)).await.unwrap_err();
        assert!(matches!(err, DeployFailure::NoWallet));
    }

    #[tokio::test]
    async fn artifact_deploy_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = ArtifactDeploy {
            path: dir.path().join("missing.json"),
        };
        let signer = PrivateKeySigner::random();
        let request = DeployRequest::new("Fan", "FAN");
        let chain = ChainConfig::spicy();
        let ctx = DeployContext {
            request: &request,
            chain: &chain,
            signer: Some(&signer),
        };
        let err = strategy.deploy(&ctx).await.unwrap_err();
        assert!(matches!(err, DeployFailure::Artifact(_)));
    }
}
