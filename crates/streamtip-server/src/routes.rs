use actix_web::http::{header, StatusCode};
use actix_web::{get, web, HttpRequest, HttpResponse};
use serde_json::json;
use streamtip::security::bearer_matches;
use streamtip::{PaymentResponse, SettlementStatus, PAYMENT_HEADER, PAYMENT_RESPONSE_HEADER, TIP_PATH};

use crate::metrics;
use crate::settlement::{build_request, interpret, resource_url, TipBody};
use crate::state::AppState;

/// Register every route on an app or test service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(tip_resource())
        .service(health)
        .service(metrics_endpoint);
}

/// `POST /api/tip`; every other method answers 405.
pub fn tip_resource() -> actix_web::Resource {
    web::resource(TIP_PATH)
        .route(web::post().to(tip))
        .default_service(web::route().to(method_not_allowed))
}

async fn method_not_allowed() -> HttpResponse {
    metrics::record_status(405);
    HttpResponse::MethodNotAllowed().json(json!({ "error": "Method not allowed" }))
}

async fn tip(req: HttpRequest, body: web::Bytes, state: web::Data<AppState>) -> HttpResponse {
    let resp = settle_tip(&req, &body, &state).await;
    metrics::record_status(resp.status().as_u16());
    resp
}

fn header_value<'a>(req: &'a HttpRequest, name: impl header::AsHeaderName) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn failed(message: impl Into<String>) -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({
        "error": "Failed to process tip",
        "message": message.into(),
    }))
}

async fn settle_tip(req: &HttpRequest, body: &[u8], state: &AppState) -> HttpResponse {
    let config = &state.config;

    let tip = match TipBody::parse(body)
        .and_then(|b| b.validate(&config.default_tip_amount, config.chain.native_decimals))
    {
        Ok(tip) => tip,
        Err(e) => {
            tracing::info!(error = %e, "Rejected tip request");
            return HttpResponse::BadRequest().json(json!({
                "error": "Invalid tip request",
                "message": e.to_string(),
            }));
        }
    };

    let resource = resource_url(
        header_value(req, header::ORIGIN),
        header_value(req, header::HOST),
    );
    let payment = header_value(req, PAYMENT_HEADER).map(str::to_string);
    let paid = payment.is_some();
    let request = build_request(config, &tip, resource, payment);

    let timer = metrics::SETTLEMENT_SECONDS.start_timer();
    let verdict = state.facilitator.settle(&request).await;
    timer.observe_duration();

    let verdict = match verdict {
        Ok(v) => v,
        Err(e) => {
            metrics::SETTLEMENTS.with_label_values(&["error"]).inc();
            tracing::error!(error = %e, resource = %request.resource_url, "Settlement failed");
            return failed(e.to_string());
        }
    };

    match interpret(&verdict).status {
        SettlementStatus::Success { transaction } => {
            metrics::SETTLEMENTS.with_label_values(&["settled"]).inc();
            tracing::info!(
                tx = %transaction,
                amount = %tip.amount,
                payer = ?verdict.payer,
                "Tip settled"
            );

            let mut resp = HttpResponse::Ok();
            let summary = PaymentResponse {
                success: true,
                transaction: transaction.clone(),
                network: config.chain.network.clone(),
                payer: verdict.payer,
            };
            match summary.to_header() {
                Ok(value) => {
                    resp.insert_header((PAYMENT_RESPONSE_HEADER, value));
                }
                Err(e) => tracing::warn!(error = %e, "Could not encode payment response header"),
            }
            resp.json(json!({
                "success": true,
                "message": "Tip processed successfully!",
                "tipMessage": tip.message,
                "amount": tip.amount,
                "transactionHash": transaction,
            }))
        }
        SettlementStatus::PaymentRequired { status, challenge } => {
            metrics::SETTLEMENTS
                .with_label_values(&["payment_required"])
                .inc();
            tracing::debug!(status, paid, "Facilitator asked for payment");
            let code = StatusCode::from_u16(status).unwrap_or(StatusCode::PAYMENT_REQUIRED);
            HttpResponse::build(code).json(challenge)
        }
        SettlementStatus::Failed { error } => {
            metrics::SETTLEMENTS.with_label_values(&["failed"]).inc();
            tracing::error!(error = %error, status = verdict.status, "Settlement failed");
            failed(error)
        }
    }
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "streamtip-server",
        "network": state.config.chain.network,
    }))
}

#[get("/metrics")]
pub async fn metrics_endpoint(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match &state.config.metrics_token {
        Some(expected) => {
            if !bearer_matches(header_value(&req, header::AUTHORIZATION), expected) {
                return HttpResponse::Unauthorized().json(json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None => {
            if !state.config.public_metrics {
                return HttpResponse::Forbidden().json(json!({
                    "error": "forbidden",
                    "message": "Set METRICS_TOKEN or STREAMTIP_PUBLIC_METRICS=true to access /metrics"
                }));
            }
        }
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}
