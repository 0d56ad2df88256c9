//! Room and wallet state for one viewer or host.
//!
//! Room membership and wallet connection are independent state machines.
//! A host joins only after fan token deployment has finished, whether it
//! succeeded or not; a failed deployment blocks tipping, never joining.
//! At most one tip is in flight at a time.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::Address;
use streamtip::deploy::{DeployContext, DeployRequest, FanTokenDeployer};
use streamtip::{ConfigError, TipError, TipReceipt};
use streamtip_wallet::{ChainInfo, WalletAdapter, WalletSession};

use crate::config::LivestreamConfig;
use crate::tip_builder::{TipOutcome, TipRequest, TipSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Host,
    #[default]
    Audience,
}

#[derive(Debug, Clone, Default)]
pub struct JoinRequest {
    pub room_id: String,
    pub user_id: String,
    /// Display name in the stream; the user ID when absent.
    pub user_name: Option<String>,
    pub role: Role,
    /// Required for hosts.
    pub token_name: Option<String>,
    /// Required for hosts.
    pub token_symbol: Option<String>,
}

impl JoinRequest {
    pub fn validate(&self) -> Result<(), TipError> {
        if self.room_id.trim().is_empty() {
            return Err(TipError::Validation("room ID is required".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(TipError::Validation("user ID is required".to_string()));
        }
        if self.role == Role::Host {
            let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
            if blank(&self.token_name) || blank(&self.token_symbol) {
                return Err(TipError::Validation(
                    "hosts must provide a fan token name and symbol".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Livestream widget credential for one room membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomTicket {
    pub app_id: String,
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
    /// Unix seconds.
    pub expires_at: u64,
    /// Hex HMAC-SHA256 of the claims, keyed by the livestream server secret.
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomState {
    NotJoined,
    Joined {
        room_id: String,
        user_id: String,
        role: Role,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanTokenStatus {
    /// Audience members never deploy.
    NotRequested,
    Ready(Address),
    Failed(String),
}

/// A tip that passed the controller's checks. Run it, then hand the result
/// back through [`RoomController::complete_tip`].
pub struct TipJob {
    sender: TipSender,
    session: WalletSession,
    request: TipRequest,
}

impl TipJob {
    pub async fn run(self) -> Result<TipOutcome, TipError> {
        self.sender.send(Some(&self.session), &self.request).await
    }
}

pub struct RoomController {
    adapter: WalletAdapter,
    sender: TipSender,
    deployer: FanTokenDeployer,
    origin: String,
    livestream: Option<LivestreamConfig>,
    room: RoomState,
    ticket: Option<RoomTicket>,
    wallet: WalletState,
    session: Option<WalletSession>,
    cached_address: Option<Address>,
    cached_chain: Option<ChainInfo>,
    fan_token: FanTokenStatus,
    tip_pending: bool,
    last_receipt: Option<TipReceipt>,
}

impl RoomController {
    pub fn new(
        adapter: WalletAdapter,
        sender: TipSender,
        deployer: FanTokenDeployer,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            adapter,
            sender,
            deployer,
            origin: origin.into(),
            livestream: None,
            room: RoomState::NotJoined,
            ticket: None,
            wallet: WalletState::Disconnected,
            session: None,
            cached_address: None,
            cached_chain: None,
            fan_token: FanTokenStatus::NotRequested,
            tip_pending: false,
            last_receipt: None,
        }
    }

    /// Credentials used to issue room tickets. Joining fails without them.
    pub fn with_livestream(mut self, livestream: LivestreamConfig) -> Self {
        self.livestream = Some(livestream);
        self
    }

    /// Ticket for the current room, issued on join.
    pub fn ticket(&self) -> Option<&RoomTicket> {
        self.ticket.as_ref()
    }

    pub fn room(&self) -> &RoomState {
        &self.room
    }

    pub fn wallet_state(&self) -> WalletState {
        self.wallet
    }

    pub fn address(&self) -> Option<Address> {
        self.cached_address
    }

    pub fn chain(&self) -> Option<&ChainInfo> {
        self.cached_chain.as_ref()
    }

    pub fn fan_token(&self) -> &FanTokenStatus {
        &self.fan_token
    }

    pub fn tip_pending(&self) -> bool {
        self.tip_pending
    }

    /// Receipt of the last confirmed direct tip.
    pub fn last_receipt(&self) -> Option<&TipReceipt> {
        self.last_receipt.as_ref()
    }

    /// `<origin>?roomID=<room>` once joined.
    pub fn share_link(&self) -> Option<String> {
        match &self.room {
            RoomState::Joined { room_id, .. } => {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(room_id.as_bytes()).collect();
                Some(format!("{}?roomID={encoded}", self.origin))
            }
            RoomState::NotJoined => None,
        }
    }

    pub async fn connect_wallet(&mut self, provider_id: &str) -> Result<Address, TipError> {
        if let Some(old) = self.session.take() {
            self.adapter.disconnect(old);
        }
        self.clear_wallet_cache();
        self.wallet = WalletState::Connecting;

        match self.adapter.connect(provider_id).await {
            Ok(session) => {
                self.cached_address = self.adapter.address(Some(&session));
                self.cached_chain = self.adapter.chain(Some(&session));
                let address = session.address;
                self.session = Some(session);
                self.wallet = WalletState::Connected;
                Ok(address)
            }
            Err(e) => {
                self.wallet = WalletState::Disconnected;
                Err(e)
            }
        }
    }

    /// Always leaves the wallet disconnected with no cached address or chain.
    pub fn disconnect_wallet(&mut self) {
        if let Some(session) = self.session.take() {
            self.adapter.disconnect(session);
        }
        self.clear_wallet_cache();
        self.wallet = WalletState::Disconnected;
    }

    fn clear_wallet_cache(&mut self) {
        self.cached_address = None;
        self.cached_chain = None;
    }

    /// Join a room. Hosts deploy (or reuse) their fan token first.
    pub async fn join(&mut self, request: JoinRequest) -> Result<(), TipError> {
        request.validate()?;
        if matches!(self.room, RoomState::Joined { .. }) {
            return Err(TipError::Validation("already in a room".to_string()));
        }
        let livestream = self
            .livestream
            .as_ref()
            .ok_or(ConfigError::MissingRequired("LIVESTREAM_APP_ID"))?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let user_name = request
            .user_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&request.user_id);
        let ticket = livestream.issue_ticket(&request.room_id, &request.user_id, user_name, now);

        if request.role == Role::Host {
            self.fan_token = self.deploy_fan_token(&request).await;
        } else {
            self.fan_token = FanTokenStatus::NotRequested;
        }

        tracing::info!(
            room = %request.room_id,
            user = %request.user_id,
            role = ?request.role,
            "Joined room"
        );
        self.ticket = Some(ticket);
        self.room = RoomState::Joined {
            room_id: request.room_id,
            user_id: request.user_id,
            role: request.role,
        };
        Ok(())
    }

    async fn deploy_fan_token(&self, request: &JoinRequest) -> FanTokenStatus {
        let deploy = DeployRequest::new(
            request.token_name.clone().unwrap_or_default(),
            request.token_symbol.clone().unwrap_or_default(),
        );
        let ctx = DeployContext {
            request: &deploy,
            chain: self.sender.chain(),
            signer: self.session.as_ref().map(|s| s.signer()),
        };
        match self.deployer.deploy(&ctx).await {
            Ok(outcome) => FanTokenStatus::Ready(outcome.address),
            Err(e) => {
                tracing::warn!(error = %e, "Fan token unavailable, tipping disabled");
                FanTokenStatus::Failed(e.to_string())
            }
        }
    }

    pub fn leave(&mut self) {
        self.room = RoomState::NotJoined;
        self.ticket = None;
        self.fan_token = FanTokenStatus::NotRequested;
    }

    /// Whether the submit control would be enabled.
    pub fn can_tip(&self) -> bool {
        matches!(self.room, RoomState::Joined { .. })
            && self.wallet == WalletState::Connected
            && !matches!(self.fan_token, FanTokenStatus::Failed(_))
            && !self.tip_pending
    }

    /// Check the request and mark a tip as in flight.
    pub fn begin_tip(&mut self, request: TipRequest) -> Result<TipJob, TipError> {
        if self.tip_pending {
            return Err(TipError::Validation("a tip is already being sent".to_string()));
        }
        if !matches!(self.room, RoomState::Joined { .. }) {
            return Err(TipError::Validation("join a room before tipping".to_string()));
        }
        if let FanTokenStatus::Failed(reason) = &self.fan_token {
            return Err(TipError::Validation(format!(
                "tipping disabled, fan token deployment failed: {reason}"
            )));
        }
        request.validate(self.session.as_ref(), self.sender.chain().native_decimals)?;
        let session = self.session.clone().ok_or(TipError::NoWallet)?;

        self.tip_pending = true;
        Ok(TipJob {
            sender: self.sender.clone(),
            session,
            request,
        })
    }

    /// Clear the in-flight flag and record the outcome.
    pub fn complete_tip(&mut self, result: &Result<TipOutcome, TipError>) {
        self.tip_pending = false;
        match result {
            Ok(TipOutcome::Direct(receipt)) => self.last_receipt = Some(receipt.clone()),
            Ok(TipOutcome::Gated(_)) => {}
            Err(e) => tracing::warn!(error = %e, "Tip failed"),
        }
    }

    pub async fn submit_tip(&mut self, request: TipRequest) -> Result<TipOutcome, TipError> {
        let job = self.begin_tip(request)?;
        let result = job.run().await;
        self.complete_tip(&result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamtip::deploy::{ArtifactDeploy, ExistingToken};
    use streamtip::ChainConfig;
    use streamtip_wallet::{EPHEMERAL_PROVIDER, LOCAL_PROVIDER};

    const JAR: Address = Address::with_last_byte(0x42);

    fn controller(deployer: FanTokenDeployer) -> RoomController {
        let chain = ChainConfig::spicy().with_rpc_url("http://127.0.0.1:1");
        RoomController::new(
            WalletAdapter::with_defaults(chain.clone(), None),
            TipSender::new(chain, "test-client").unwrap(),
            deployer,
            "https://live.example.com",
        )
        .with_livestream(LivestreamConfig::new("12345", "very-secret"))
    }

    fn audience(room: &str) -> JoinRequest {
        JoinRequest {
            room_id: room.to_string(),
            user_id: "viewer-1".to_string(),
            ..Default::default()
        }
    }

    fn host(name: Option<&str>, symbol: Option<&str>) -> JoinRequest {
        JoinRequest {
            room_id: "room-1".to_string(),
            user_id: "host-1".to_string(),
            role: Role::Host,
            token_name: name.map(str::to_string),
            token_symbol: symbol.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn join_requires_ids_and_host_token() {
        assert!(audience("room-1").validate().is_ok());
        assert!(audience("").validate().is_err());
        assert!(JoinRequest {
            room_id: "r".into(),
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(host(Some("Fan"), None).validate().is_err());
        assert!(host(Some(" "), Some("FAN")).validate().is_err());
        assert!(host(Some("Fan"), Some("FAN")).validate().is_ok());
    }

    #[tokio::test]
    async fn share_link_after_join() {
        let mut c = controller(FanTokenDeployer::new());
        assert_eq!(c.share_link(), None);
        c.join(audience("my room")).await.unwrap();
        assert_eq!(
            c.share_link().as_deref(),
            Some("https://live.example.com?roomID=my+room")
        );
        assert!(c.join(audience("other")).await.is_err());
        c.leave();
        assert_eq!(c.room(), &RoomState::NotJoined);
    }

    #[tokio::test]
    async fn join_issues_ticket_with_display_name() {
        let mut c = controller(FanTokenDeployer::new());
        c.join(JoinRequest {
            user_name: Some("Ana".to_string()),
            ..audience("room-1")
        })
        .await
        .unwrap();
        let ticket = c.ticket().unwrap();
        assert_eq!(ticket.room_id, "room-1");
        assert_eq!(ticket.user_id, "viewer-1");
        assert_eq!(ticket.user_name, "Ana");
        assert_eq!(ticket.app_id, "12345");
        c.leave();
        assert!(c.ticket().is_none());

        c.join(audience("room-2")).await.unwrap();
        assert_eq!(c.ticket().unwrap().user_name, "viewer-1");
    }

    #[tokio::test]
    async fn join_without_livestream_credentials_fails() {
        let chain = ChainConfig::spicy().with_rpc_url("http://127.0.0.1:1");
        let mut c = RoomController::new(
            WalletAdapter::with_defaults(chain.clone(), None),
            TipSender::new(chain, "test-client").unwrap(),
            FanTokenDeployer::new(),
            "https://live.example.com",
        );
        let err = c.join(audience("room-1")).await.unwrap_err();
        assert!(matches!(
            err,
            TipError::Configuration(ConfigError::MissingRequired("LIVESTREAM_APP_ID"))
        ));
        assert_eq!(c.room(), &RoomState::NotJoined);
    }

    #[tokio::test]
    async fn disconnect_always_clears_cache() {
        let mut c = controller(FanTokenDeployer::new());

        // Never connected.
        c.disconnect_wallet();
        assert_eq!(c.wallet_state(), WalletState::Disconnected);
        assert!(c.address().is_none() && c.chain().is_none());

        let address = c.connect_wallet(EPHEMERAL_PROVIDER).await.unwrap();
        assert_eq!(c.wallet_state(), WalletState::Connected);
        assert_eq!(c.address(), Some(address));
        assert_eq!(c.chain().map(|ch| ch.id), Some(88882));

        c.disconnect_wallet();
        assert_eq!(c.wallet_state(), WalletState::Disconnected);
        assert!(c.address().is_none() && c.chain().is_none());

        // Twice in a row is fine.
        c.disconnect_wallet();
        assert!(c.address().is_none());
    }

    #[tokio::test]
    async fn failed_connect_returns_to_disconnected() {
        let mut c = controller(FanTokenDeployer::new());
        c.connect_wallet(EPHEMERAL_PROVIDER).await.unwrap();

        // No key configured for the local provider.
        let err = c.connect_wallet(LOCAL_PROVIDER).await.unwrap_err();
        assert!(matches!(err, TipError::Connection(_)));
        assert_eq!(c.wallet_state(), WalletState::Disconnected);
        assert!(c.address().is_none() && c.chain().is_none());
    }

    #[tokio::test]
    async fn host_deploy_failure_blocks_tipping_not_joining() {
        // Artifact strategy without a file: deployment fails.
        let deployer = FanTokenDeployer::new().with_strategy(ArtifactDeploy {
            path: "/nonexistent/FanToken.json".into(),
        });
        let mut c = controller(deployer);
        c.connect_wallet(EPHEMERAL_PROVIDER).await.unwrap();
        c.join(host(Some("Fan Club"), Some("FAN"))).await.unwrap();

        assert!(matches!(c.room(), RoomState::Joined { role: Role::Host, .. }));
        assert!(matches!(c.fan_token(), FanTokenStatus::Failed(_)));
        assert!(!c.can_tip());
        let err = c
            .begin_tip(TipRequest::direct(Some(JAR), "hi", "1"))
            .err()
            .unwrap();
        assert!(matches!(err, TipError::Validation(_)));
    }

    #[tokio::test]
    async fn host_without_strategies_fails_deploy() {
        let mut c = controller(FanTokenDeployer::standard(None, None));
        c.join(host(Some("Fan Club"), Some("FAN"))).await.unwrap();
        assert!(matches!(c.fan_token(), FanTokenStatus::Failed(_)));
        // Existing token at an unreachable RPC fails too.
        let mut c = controller(FanTokenDeployer::new().with_strategy(ExistingToken { address: JAR }));
        c.join(host(Some("Fan Club"), Some("FAN"))).await.unwrap();
        assert!(matches!(c.fan_token(), FanTokenStatus::Failed(_)));
    }

    #[tokio::test]
    async fn one_tip_in_flight() {
        let mut c = controller(FanTokenDeployer::new());
        c.join(audience("room-1")).await.unwrap();

        // No wallet yet.
        assert!(!c.can_tip());
        assert!(matches!(
            c.begin_tip(TipRequest::direct(Some(JAR), "hi", "1")).err(),
            Some(TipError::NoWallet)
        ));
        assert!(!c.tip_pending());

        c.connect_wallet(EPHEMERAL_PROVIDER).await.unwrap();
        assert!(c.can_tip());
        let _job = c.begin_tip(TipRequest::direct(Some(JAR), "hi", "1")).unwrap();
        assert!(c.tip_pending());
        assert!(!c.can_tip());

        let second = c.begin_tip(TipRequest::direct(Some(JAR), "again", "1"));
        assert!(matches!(second.err(), Some(TipError::Validation(_))));

        c.complete_tip(&Err(TipError::Chain("reverted".into())));
        assert!(!c.tip_pending());
        assert!(c.can_tip());
    }

    #[tokio::test]
    async fn tipping_requires_room() {
        let mut c = controller(FanTokenDeployer::new());
        c.connect_wallet(EPHEMERAL_PROVIDER).await.unwrap();
        assert!(c.begin_tip(TipRequest::direct(Some(JAR), "", "1")).is_err());
        assert!(!c.tip_pending());
    }
}
