//! Payment-gated tip endpoint.
//!
//! `POST /api/tip` forwards the caller's `X-PAYMENT` proof to a facilitator
//! and answers with the settlement outcome: 200 with a transaction reference,
//! the facilitator's own 4xx challenge, or 500.
//!
//! # Modules
//!
//! - [`config`]: environment configuration ([`ServerConfig`])
//! - [`facilitator`]: the `/settle` client ([`HttpFacilitator`]) and its trait seam
//! - [`settlement`]: parameter assembly and verdict interpretation
//! - [`routes`]: actix handlers
//! - [`metrics`]: Prometheus counters

pub mod config;
pub mod facilitator;
pub mod metrics;
pub mod routes;
pub mod settlement;
pub mod state;

pub use config::ServerConfig;
pub use facilitator::{
    Facilitator, FacilitatorSettlement, HttpFacilitator, RouteConfig, SettlementRequest,
};
pub use state::AppState;
