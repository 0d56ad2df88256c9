use std::fmt;
use std::path::PathBuf;

use alloy::primitives::Address;
use streamtip::hmac::sign_body;
use streamtip::{ChainConfig, ConfigError, Network};
use url::Url;

use crate::room::RoomTicket;

pub const DEFAULT_X402_API_URL: &str = "http://localhost:3001/api/tip";

/// Lifetime of a livestream room ticket.
pub const TICKET_TTL_SECS: u64 = 7200;

/// Credentials for the livestream widget SDK.
#[derive(Clone)]
pub struct LivestreamConfig {
    pub app_id: String,
    server_secret: String,
}

impl LivestreamConfig {
    pub fn new(app_id: impl Into<String>, server_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            server_secret: server_secret.into(),
        }
    }

    /// Sign a widget ticket for one room membership, valid for [`TICKET_TTL_SECS`].
    pub fn issue_ticket(
        &self,
        room_id: &str,
        user_id: &str,
        user_name: &str,
        now: u64,
    ) -> RoomTicket {
        let expires_at = now + TICKET_TTL_SECS;
        let claims = format!("{}:{room_id}:{user_id}:{user_name}:{expires_at}", self.app_id);
        RoomTicket {
            app_id: self.app_id.clone(),
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            expires_at,
            signature: sign_body(self.server_secret.as_bytes(), claims.as_bytes()),
        }
    }
}

impl fmt::Debug for LivestreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivestreamConfig")
            .field("app_id", &self.app_id)
            .field("server_secret", &"[REDACTED]")
            .finish()
    }
}

/// Everything the viewer side needs, read once at startup.
#[derive(Clone)]
pub struct ClientConfig {
    /// Sent as `x-client-id` on gated requests.
    pub client_id: String,
    pub chain: ChainConfig,
    pub tip_jar: Option<Address>,
    pub fan_token: Option<Address>,
    pub fan_token_artifact: Option<PathBuf>,
    pub x402_api_url: String,
    pub wallet_key: Option<String>,
    /// Needed only to join a room.
    pub livestream: Option<LivestreamConfig>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("chain", &self.chain.name)
            .field("tip_jar", &self.tip_jar)
            .field("fan_token", &self.fan_token)
            .field("fan_token_artifact", &self.fan_token_artifact)
            .field("x402_api_url", &self.x402_api_url)
            .field("wallet_key", &self.wallet_key.as_ref().map(|_| "[REDACTED]"))
            .field("livestream", &self.livestream)
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

fn optional_address(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<Address>, ConfigError> {
    optional(lookup, key)
        .map(|v| {
            v.parse()
                .map_err(|_| ConfigError::InvalidAddress { key, value: v })
        })
        .transpose()
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let client_id = required(&lookup, "STREAMTIP_CLIENT_ID")?;
        // Both or neither.
        let livestream = match (
            optional(&lookup, "LIVESTREAM_APP_ID"),
            optional(&lookup, "LIVESTREAM_SERVER_SECRET"),
        ) {
            (Some(app_id), Some(secret)) => Some(LivestreamConfig::new(app_id, secret)),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingRequired("LIVESTREAM_SERVER_SECRET")),
            (None, Some(_)) => return Err(ConfigError::MissingRequired("LIVESTREAM_APP_ID")),
        };

        let network: Network = optional(&lookup, "NETWORK")
            .unwrap_or_default()
            .parse()?;
        let mut chain = ChainConfig::for_network(network);
        if let Some(rpc_url) = optional(&lookup, "RPC_URL") {
            Url::parse(&rpc_url).map_err(|_| ConfigError::InvalidUrl {
                key: "RPC_URL",
                value: rpc_url.clone(),
            })?;
            chain = chain.with_rpc_url(rpc_url);
        }

        let x402_api_url =
            optional(&lookup, "X402_API_URL").unwrap_or_else(|| DEFAULT_X402_API_URL.to_string());
        Url::parse(&x402_api_url).map_err(|_| ConfigError::InvalidUrl {
            key: "X402_API_URL",
            value: x402_api_url.clone(),
        })?;

        Ok(Self {
            client_id,
            chain,
            tip_jar: optional_address(&lookup, "TIP_JAR_ADDRESS")?,
            fan_token: optional_address(&lookup, "FAN_TOKEN_ADDRESS")?,
            fan_token_artifact: optional(&lookup, "FAN_TOKEN_ARTIFACT").map(PathBuf::from),
            x402_api_url,
            wallet_key: optional(&lookup, "WALLET_PRIVATE_KEY"),
            livestream,
        })
    }
}
