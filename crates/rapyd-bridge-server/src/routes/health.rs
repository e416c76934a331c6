use actix_web::{web, HttpRequest, HttpResponse};
use rapyd::security::constant_time_eq;
use rapyd::{Environment, HttpTransport};

use crate::metrics::REGISTRY;
use crate::state::AppState;

/// GET /health - Health check endpoint
///
/// Reports which environments have credentials, never the credentials themselves.
pub async fn health<T: HttpTransport + 'static>(state: web::Data<AppState<T>>) -> HttpResponse {
    let gateway = state.dispatcher.config();
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "rapyd-bridge",
        "version": env!("CARGO_PKG_VERSION"),
        "environments": {
            "sandbox": gateway.environment(Environment::Sandbox).has_credentials(),
            "live": gateway.environment(Environment::Live).has_credentials(),
        },
    }))
}

/// GET /metrics - Prometheus metrics endpoint (optionally auth-gated)
pub async fn metrics<T: HttpTransport + 'static>(
    req: HttpRequest,
    state: web::Data<AppState<T>>,
) -> HttpResponse {
    // Check bearer token if METRICS_TOKEN is configured
    if let Some(ref expected_token) = state.config.metrics_token {
        let authorized = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| constant_time_eq(token.as_bytes(), expected_token.as_bytes()))
            .unwrap_or(false);

        if !authorized {
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "unauthorized",
                "message": "Valid Bearer token required for /metrics"
            }));
        }
    }

    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return HttpResponse::InternalServerError().body("Failed to encode metrics");
    }

    let output = String::from_utf8(buffer).unwrap_or_default();
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(output)
}

pub fn configure<T: HttpTransport + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::<T>))
        .route("/metrics", web::get().to(metrics::<T>));
}
