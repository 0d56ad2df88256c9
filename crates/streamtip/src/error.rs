use thiserror::Error;

/// Startup configuration problems. Fatal: binaries exit on these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid address for {key}: {value}")]
    InvalidAddress { key: &'static str, value: String },

    #[error("invalid URL for {key}: {value}")]
    InvalidUrl { key: &'static str, value: String },
}

/// Errors returned by tipping operations.
#[derive(Debug, Error)]
pub enum TipError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("wallet connection failed: {0}")]
    Connection(String),

    #[error("wallet not connected, connect a wallet first")]
    NoWallet,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("chain error: {0}")]
    Chain(String),

    #[error("facilitator error: {0}")]
    Facilitator(String),

    #[error("tip endpoint not available ({0}), use the direct contract path instead")]
    GatedUnavailable(String),

    #[error("payment rejected: {0}")]
    PaymentRejected(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("signature error: {0}")]
    Signature(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl TipError {
    /// True for errors raised before any network or chain I/O.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TipError::NoWallet | TipError::InvalidAmount(_) | TipError::Validation(_)
        )
    }
}
