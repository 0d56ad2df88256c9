use std::fmt;
use std::time::Duration;

use alloy::primitives::Address;
use streamtip::{parse_amount, ChainConfig, ConfigError, Network, DEFAULT_TIP_AMOUNT};
use url::Url;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_FACILITATOR_URL: &str = "http://localhost:4022";
pub const DEFAULT_SETTLEMENT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_RATE_LIMIT_RPM: u64 = 60;

/// Settlement service configuration, read once at startup.
#[derive(Clone)]
pub struct ServerConfig {
    pub chain: ChainConfig,
    /// Recipient of every tip.
    pub pay_to: Address,
    pub facilitator_url: String,
    facilitator_secret: Vec<u8>,
    pub port: u16,
    pub settlement_timeout: Duration,
    pub default_tip_amount: String,
    pub rate_limit_rpm: u64,
    pub allowed_origins: Vec<String>,
    pub metrics_token: Option<String>,
    pub public_metrics: bool,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("network", &self.chain.network)
            .field("pay_to", &self.pay_to)
            .field("facilitator_url", &self.facilitator_url)
            .field("facilitator_secret", &"[REDACTED]")
            .field("port", &self.port)
            .field("settlement_timeout", &self.settlement_timeout)
            .field("default_tip_amount", &self.default_tip_amount)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field("allowed_origins", &self.allowed_origins)
            .field("metrics_token", &self.metrics_token.as_ref().map(|_| "[REDACTED]"))
            .field("public_metrics", &self.public_metrics)
            .finish()
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingRequired(key))
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive_number<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match optional(lookup, key) {
        None => Ok(default),
        Some(raw) => match raw.parse::<T>() {
            Ok(n) if n > T::default() => Ok(n),
            _ => Err(ConfigError::InvalidValue { key, value: raw }),
        },
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    optional(lookup, key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let facilitator_secret = required(&lookup, "FACILITATOR_SECRET_KEY")?.into_bytes();
        if facilitator_secret.len() < 32 {
            tracing::warn!(
                len = facilitator_secret.len(),
                "FACILITATOR_SECRET_KEY is shorter than 32 bytes"
            );
        }

        let pay_to_raw = required(&lookup, "SERVER_WALLET_ADDRESS")?;
        let pay_to = pay_to_raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidAddress {
                key: "SERVER_WALLET_ADDRESS",
                value: pay_to_raw.clone(),
            })?;

        let network: Network = optional(&lookup, "NETWORK")
            .unwrap_or_default()
            .parse()?;

        let facilitator_url = optional(&lookup, "FACILITATOR_URL")
            .unwrap_or_else(|| DEFAULT_FACILITATOR_URL.to_string());
        Url::parse(&facilitator_url).map_err(|_| ConfigError::InvalidUrl {
            key: "FACILITATOR_URL",
            value: facilitator_url.clone(),
        })?;

        let default_tip_amount =
            optional(&lookup, "DEFAULT_TIP_AMOUNT").unwrap_or_else(|| DEFAULT_TIP_AMOUNT.to_string());
        let chain = ChainConfig::for_network(network);
        if parse_amount(&default_tip_amount, chain.native_decimals).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "DEFAULT_TIP_AMOUNT",
                value: default_tip_amount,
            });
        }

        let allowed_origins: Vec<String> = optional(&lookup, "ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::InvalidValue {
                key: "ALLOWED_ORIGINS",
                value: "*".to_string(),
            });
        }

        Ok(Self {
            chain,
            pay_to,
            facilitator_url: facilitator_url.trim_end_matches('/').to_string(),
            facilitator_secret,
            port: positive_number(&lookup, "PORT", DEFAULT_PORT)?,
            settlement_timeout: Duration::from_secs(positive_number(
                &lookup,
                "SETTLEMENT_TIMEOUT_SECS",
                DEFAULT_SETTLEMENT_TIMEOUT_SECS,
            )?),
            default_tip_amount,
            rate_limit_rpm: positive_number(&lookup, "RATE_LIMIT_RPM", DEFAULT_RATE_LIMIT_RPM)?,
            allowed_origins,
            metrics_token: optional(&lookup, "METRICS_TOKEN"),
            public_metrics: flag(&lookup, "STREAMTIP_PUBLIC_METRICS"),
        })
    }

    pub fn facilitator_secret(&self) -> &[u8] {
        &self.facilitator_secret
    }
}
