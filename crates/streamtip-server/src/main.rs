use std::sync::Arc;

use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{web, App, HttpServer};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use streamtip_server::{routes, AppState, HttpFacilitator, ServerConfig};

fn build_cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        Cors::default()
            .allowed_origin_fn(|origin, _| {
                origin
                    .to_str()
                    .map(|o| o == "http://localhost" || o.starts_with("http://localhost:"))
                    .unwrap_or(false)
            })
            .allow_any_method()
            .allow_any_header()
            .expose_headers(["X-PAYMENT-RESPONSE"])
            .max_age(3600)
    } else {
        let mut cors = Cors::default();
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
        cors.allow_any_method()
            .allow_any_header()
            .expose_headers(["X-PAYMENT-RESPONSE"])
            .max_age(3600)
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,actix_web=info".into()))
        .with(fmt::layer())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let facilitator = HttpFacilitator::new(
        &config.facilitator_url,
        config.facilitator_secret(),
        config.settlement_timeout,
    )
    .map_err(std::io::Error::other)?;

    tracing::info!(
        network = %config.chain.network,
        chain = %config.chain.name,
        pay_to = %config.pay_to,
        facilitator = %facilitator.settle_url(),
        "Tip server listening on http://localhost:{}",
        config.port
    );
    tracing::info!("Endpoints: POST /api/tip, GET /health, GET /metrics");
    tracing::info!("Rate limit: {} req/min per IP", config.rate_limit_rpm);

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(config.rate_limit_rpm)
        .finish()
        .ok_or_else(|| std::io::Error::other("failed to build rate limiter config"))?;

    let port = config.port;
    let cors_origins = config.allowed_origins.clone();
    let state = web::Data::new(AppState::new(config, Arc::new(facilitator)));

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors_origins))
            .wrap(Governor::new(&governor_conf))
            .app_data(web::JsonConfig::default().limit(65_536))
            .app_data(web::PayloadConfig::new(65_536))
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
