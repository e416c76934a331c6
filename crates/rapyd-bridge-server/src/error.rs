use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use rapyd::PaymentError;
use std::fmt;

/// Route-level error. Always rendered as `{error, message, hint, raw?}`.
#[derive(Debug)]
pub struct ApiError(pub PaymentError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ApiError {}

impl From<PaymentError> for ApiError {
    fn from(e: PaymentError) -> Self {
        ApiError(e)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let canonical = self.0.canonical();
        let mut body = serde_json::json!({
            "error": canonical.code,
            "message": canonical.message,
            "hint": canonical.hint,
        });
        if let Some(raw) = canonical.raw {
            body["raw"] = raw;
        }

        HttpResponse::build(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use rapyd::CanonicalError;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.error_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_rt::test]
    async fn configuration_error_is_500_with_descriptive_message() {
        let (status, body) = body_json(ApiError(PaymentError::Configuration(
            "missing API keys for live environment".to_string(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "CONFIGURATION_ERROR");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("missing API keys for live environment"));
        assert!(body.get("raw").is_none());
    }

    #[actix_rt::test]
    async fn rejection_carries_triple_and_raw() {
        let raw = serde_json::json!({"status": {"error_code": "CARD_EXPIRED"}});
        let (status, body) = body_json(ApiError(PaymentError::GatewayRejection {
            status: 400,
            error: CanonicalError::new(
                "EXPIRED_CARD",
                "The card has expired.",
                "Use a card with a valid expiration date.",
            )
            .with_raw(raw.clone()),
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "EXPIRED_CARD");
        assert_eq!(body["hint"], "Use a card with a valid expiration date.");
        assert_eq!(body["raw"], raw);
    }

    #[actix_rt::test]
    async fn transport_error_hides_cause() {
        let (status, body) = body_json(ApiError(PaymentError::Transport {
            cause: "dns error: sandboxapi.rapyd.net".to_string(),
            timed_out: false,
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "TRANSPORT_ERROR");
        assert!(!body.to_string().contains("dns error"));
    }
}
