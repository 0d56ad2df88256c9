//! Wallet adapter: a registry of wallet providers and the sessions they open.
//!
//! A [`WalletSession`] is created by [`WalletAdapter::connect`] and consumed by
//! [`WalletAdapter::disconnect`]. Sessions are replaced, never mutated, so
//! callers hold at most one and drop it to forget the wallet.

use std::fmt;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use streamtip::{ChainConfig, TipError};

/// Provider id of [`LocalKeyProvider`].
pub const LOCAL_PROVIDER: &str = "local";

/// Provider id of [`EphemeralProvider`].
pub const EPHEMERAL_PROVIDER: &str = "ephemeral";

/// Chain a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainInfo {
    pub id: u64,
    pub name: String,
    /// CAIP-2 identifier, e.g. `eip155:88882`.
    pub network: String,
}

impl From<&ChainConfig> for ChainInfo {
    fn from(config: &ChainConfig) -> Self {
        Self {
            id: config.chain_id,
            name: config.name.clone(),
            network: config.network.clone(),
        }
    }
}

/// A connected wallet.
#[derive(Clone)]
pub struct WalletSession {
    pub address: Address,
    pub chain: ChainInfo,
    pub provider_id: String,
    signer: PrivateKeySigner,
}

impl WalletSession {
    /// Signing handle for transactions and payment authorizations.
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("address", &self.address)
            .field("chain", &self.chain)
            .field("provider_id", &self.provider_id)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

/// Source of signing keys.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn id(&self) -> &str;

    /// Whether the provider can currently hand out a signer.
    fn is_available(&self) -> bool;

    async fn connect(&self) -> Result<PrivateKeySigner, TipError>;
}

/// Signs with a private key taken from configuration (`WALLET_PRIVATE_KEY`).
pub struct LocalKeyProvider {
    key: Option<String>,
}

impl LocalKeyProvider {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.filter(|k| !k.trim().is_empty()),
        }
    }
}

impl fmt::Debug for LocalKeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKeyProvider")
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl WalletProvider for LocalKeyProvider {
    fn id(&self) -> &str {
        LOCAL_PROVIDER
    }

    fn is_available(&self) -> bool {
        self.key.is_some()
    }

    async fn connect(&self) -> Result<PrivateKeySigner, TipError> {
        let key = self.key.as_deref().ok_or_else(|| {
            TipError::Connection(
                "no local wallet available, set WALLET_PRIVATE_KEY".to_string(),
            )
        })?;
        let key = key.trim();
        key.strip_prefix("0x")
            .unwrap_or(key)
            .parse::<PrivateKeySigner>()
            .map_err(|e| TipError::Connection(format!("invalid private key: {e}")))
    }
}

/// Generates a fresh random key on every connect. For demos and tests.
#[derive(Debug, Default)]
pub struct EphemeralProvider;

#[async_trait]
impl WalletProvider for EphemeralProvider {
    fn id(&self) -> &str {
        EPHEMERAL_PROVIDER
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn connect(&self) -> Result<PrivateKeySigner, TipError> {
        Ok(PrivateKeySigner::random())
    }
}

/// Registry of wallet providers for one chain.
pub struct WalletAdapter {
    chain: ChainConfig,
    providers: Vec<Box<dyn WalletProvider>>,
}

impl WalletAdapter {
    pub fn new(chain: ChainConfig) -> Self {
        Self {
            chain,
            providers: Vec::new(),
        }
    }

    /// Adapter with the `local` provider (from `key`) and the `ephemeral` provider.
    pub fn with_defaults(chain: ChainConfig, key: Option<String>) -> Self {
        Self::new(chain)
            .with_provider(LocalKeyProvider::new(key))
            .with_provider(EphemeralProvider)
    }

    pub fn with_provider(mut self, provider: impl WalletProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Whether `provider_id` is registered and able to connect.
    pub fn is_installed(&self, provider_id: &str) -> bool {
        self.find(provider_id).is_some_and(|p| p.is_available())
    }

    fn find(&self, provider_id: &str) -> Option<&dyn WalletProvider> {
        self.providers
            .iter()
            .find(|p| p.id() == provider_id)
            .map(|p| p.as_ref())
    }

    /// Open a session. No retry: provider failures come straight back.
    pub async fn connect(&self, provider_id: &str) -> Result<WalletSession, TipError> {
        let provider = self.find(provider_id).ok_or_else(|| {
            TipError::Connection(format!("unknown wallet provider '{provider_id}'"))
        })?;

        let signer = provider.connect().await.inspect_err(|e| {
            tracing::warn!(provider = provider_id, error = %e, "Wallet connect failed");
        })?;

        let session = WalletSession {
            address: signer.address(),
            chain: ChainInfo::from(&self.chain),
            provider_id: provider_id.to_string(),
            signer,
        };
        tracing::info!(
            provider = provider_id,
            address = %session.address,
            chain_id = session.chain.id,
            "Wallet connected"
        );
        Ok(session)
    }

    pub fn disconnect(&self, session: WalletSession) {
        tracing::info!(
            provider = %session.provider_id,
            address = %session.address,
            "Wallet disconnected"
        );
        drop(session);
    }

    pub fn address(&self, session: Option<&WalletSession>) -> Option<Address> {
        session.map(|s| s.address)
    }

    pub fn chain(&self, session: Option<&WalletSession>) -> Option<ChainInfo> {
        session.map(|s| s.chain.clone())
    }
}
