use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, user-facing error shape.
///
/// `raw` keeps the upstream payload for operators; it is never the primary
/// message shown to end users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalError {
    pub code: String,
    pub message: String,
    pub hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl CanonicalError {
    pub fn new(code: &str, message: &str, hint: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            hint: hint.to_string(),
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// Errors returned by signing and dispatch.
///
/// Messages never contain key material.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Missing or unusable credentials for the selected environment.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed signable request (bad path, unknown method, non-object body).
    #[error("validation error: {0}")]
    Validation(String),

    /// No response received. Safe to retry with a fresh signature.
    #[error("transport error: {cause}")]
    Transport { cause: String, timed_out: bool },

    /// The gateway answered with a non-2xx status.
    #[error("gateway rejected request ({status}): {}", .error.code)]
    GatewayRejection { status: u16, error: CanonicalError },

    /// 2xx response that did not carry the expected envelope.
    #[error("unexpected gateway response: {0}")]
    UnexpectedResponse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PaymentError {
    /// HTTP status the front door should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) | PaymentError::Serialization(_) => 500,
            PaymentError::Validation(_) | PaymentError::GatewayRejection { .. } => 400,
            PaymentError::Transport { timed_out: true, .. } => 504,
            PaymentError::Transport { .. } | PaymentError::UnexpectedResponse(_) => 502,
        }
    }

    /// Only transport failures are worth retrying, and only with a new salt and timestamp.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::Transport { .. })
    }

    /// The `{code, message, hint, raw}` triple for this failure.
    pub fn canonical(&self) -> CanonicalError {
        match self {
            PaymentError::GatewayRejection { error, .. } => error.clone(),
            PaymentError::Configuration(msg) => CanonicalError::new(
                "CONFIGURATION_ERROR",
                &format!("Server configuration error: {msg}"),
                "Contact the site operator; the payment service is not configured.",
            ),
            PaymentError::Validation(msg) => CanonicalError::new(
                "VALIDATION_ERROR",
                msg,
                "Check the request fields and try again.",
            ),
            PaymentError::Transport { timed_out, .. } => CanonicalError::new(
                "TRANSPORT_ERROR",
                if *timed_out {
                    "The payment gateway did not respond in time."
                } else {
                    "The payment gateway could not be reached."
                },
                "Please try again in a moment.",
            ),
            PaymentError::UnexpectedResponse(_) => CanonicalError::new(
                "UPSTREAM_RESPONSE_ERROR",
                "The payment gateway returned an unexpected response.",
                "Please try again or contact support.",
            ),
            PaymentError::Serialization(_) => CanonicalError::new(
                "INTERNAL_ERROR",
                "The request could not be encoded.",
                "Please try again or contact support.",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(PaymentError::Configuration("x".into()).http_status(), 500);
        assert_eq!(PaymentError::Validation("x".into()).http_status(), 400);
        assert_eq!(
            PaymentError::Transport {
                cause: "reset".into(),
                timed_out: false
            }
            .http_status(),
            502
        );
        assert_eq!(
            PaymentError::Transport {
                cause: "timeout".into(),
                timed_out: true
            }
            .http_status(),
            504
        );
        let rejection = PaymentError::GatewayRejection {
            status: 400,
            error: CanonicalError::new("NO_FUNDS", "m", "h"),
        };
        assert_eq!(rejection.http_status(), 400);
        assert_eq!(rejection.canonical().code, "NO_FUNDS");
    }

    #[test]
    fn only_transport_is_retryable() {
        assert!(PaymentError::Transport {
            cause: "reset".into(),
            timed_out: false
        }
        .is_retryable());
        assert!(!PaymentError::Configuration("x".into()).is_retryable());
        assert!(!PaymentError::GatewayRejection {
            status: 400,
            error: CanonicalError::new("A", "b", "c"),
        }
        .is_retryable());
    }

    #[test]
    fn raw_is_omitted_when_absent() {
        let json = serde_json::to_value(CanonicalError::new("A", "b", "c")).unwrap();
        assert!(json.get("raw").is_none());
        let json = serde_json::to_value(
            CanonicalError::new("A", "b", "c").with_raw(serde_json::json!({"k": 1})),
        )
        .unwrap();
        assert_eq!(json["raw"]["k"], 1);
    }
}
