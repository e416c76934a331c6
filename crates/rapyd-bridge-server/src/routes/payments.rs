use actix_web::{web, HttpResponse};
use rapyd::{Environment, HttpTransport, Method, PaymentError};

use crate::error::ApiError;
use crate::metrics::{GATEWAY_REJECTIONS, REQUESTS_TOTAL, UPSTREAM_LATENCY};
use crate::state::AppState;

const PAYMENTS_PATH: &str = "/v1/payments";
const CHECKOUT_PATH: &str = "/v1/checkout";

/// Split the inbound body into the environment selector and the payload to forward.
///
/// The body must be a JSON object. `env` is removed so it never reaches the gateway.
fn parse_inbound(body: &[u8]) -> Result<(Environment, serde_json::Value), PaymentError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| PaymentError::Validation(format!("request body is not valid JSON: {e}")))?;

    let serde_json::Value::Object(mut fields) = value else {
        return Err(PaymentError::Validation(
            "request body must be a JSON object".to_string(),
        ));
    };

    let environment = Environment::from_selector(fields.remove("env").as_ref());
    Ok((environment, serde_json::Value::Object(fields)))
}

/// Shared implementation for the forwarding routes.
async fn forward<T: HttpTransport>(
    state: &AppState<T>,
    route: &str,
    path: &str,
    body: &[u8],
) -> Result<HttpResponse, ApiError> {
    let (environment, payload) = parse_inbound(body).inspect_err(|_| {
        REQUESTS_TOTAL.with_label_values(&[route, "invalid"]).inc();
    })?;

    let timer = UPSTREAM_LATENCY.start_timer();
    let result = state
        .dispatcher
        .dispatch(environment, Method::Post, path, Some(&payload))
        .await;
    timer.observe_duration();

    match result {
        Ok(data) => {
            REQUESTS_TOTAL.with_label_values(&[route, "ok"]).inc();
            Ok(HttpResponse::Ok().json(data))
        }
        Err(e) => {
            let outcome = match &e {
                PaymentError::GatewayRejection { error, .. } => {
                    GATEWAY_REJECTIONS
                        .with_label_values(&[error.code.as_str()])
                        .inc();
                    "rejected"
                }
                PaymentError::Transport { .. } => "transport_error",
                PaymentError::Configuration(_) => "config_error",
                _ => "error",
            };
            REQUESTS_TOTAL.with_label_values(&[route, outcome]).inc();
            Err(ApiError(e))
        }
    }
}

/// POST /api/create-direct-payment - Sign and forward to /v1/payments
pub async fn create_direct_payment<T: HttpTransport + 'static>(
    state: web::Data<AppState<T>>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    forward(&state, "create_direct_payment", PAYMENTS_PATH, &body).await
}

/// POST /api/create-checkout-session - Sign and forward to /v1/checkout
pub async fn create_checkout_session<T: HttpTransport + 'static>(
    state: web::Data<AppState<T>>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    forward(&state, "create_checkout_session", CHECKOUT_PATH, &body).await
}

pub fn configure<T: HttpTransport + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/api/create-direct-payment",
        web::post().to(create_direct_payment::<T>),
    )
    .route(
        "/api/create-checkout-session",
        web::post().to(create_checkout_session::<T>),
    );
}
