//! Signed request dispatch.
//!
//! Resolves environment credentials, signs, sends the exact signed body, and
//! normalizes the outcome: the gateway's `data` member on success, a
//! translated [`CanonicalError`] on rejection, or a transport error when no
//! response arrived.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{Environment, GatewayConfig};
use crate::constants::{
    CONTENT_TYPE_JSON, HEADER_ACCESS_KEY, HEADER_IDEMPOTENCY, HEADER_SALT, HEADER_SIGNATURE,
    HEADER_TIMESTAMP,
};
use crate::error::PaymentError;
use crate::signer::{self, Clock, Method, OsRandom, RandomSource, SystemClock};
use crate::translate::translate_upstream;
use crate::transport::{HttpTransport, OutboundRequest, ReqwestTransport, TransportFailure};

/// Holds only read-only configuration; concurrent calls share nothing mutable.
pub struct Dispatcher<T: HttpTransport> {
    config: Arc<GatewayConfig>,
    transport: T,
    clock: Box<dyn Clock>,
    random: Box<dyn RandomSource>,
}

impl Dispatcher<ReqwestTransport> {
    /// Production dispatcher: reqwest transport, wall clock, OS-seeded CSPRNG.
    pub fn with_reqwest(config: GatewayConfig) -> Self {
        let transport = ReqwestTransport::new().expect("failed to create HTTP client");
        Self::new(config, transport)
    }
}

impl<T: HttpTransport> Dispatcher<T> {
    pub fn new(config: GatewayConfig, transport: T) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            clock: Box::new(SystemClock),
            random: Box::new(OsRandom),
        }
    }

    /// Replace the clock and randomness source (deterministic tests).
    pub fn with_sources(
        mut self,
        clock: impl Clock + 'static,
        random: impl RandomSource + 'static,
    ) -> Self {
        self.clock = Box::new(clock);
        self.random = Box::new(random);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sign and send one request, returning the unwrapped gateway payload.
    pub async fn dispatch(
        &self,
        environment: Environment,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, PaymentError> {
        let env_config = self.config.environment(environment);
        let credentials = env_config.credentials.as_ref().ok_or_else(|| {
            tracing::error!(environment = %environment, "missing gateway credentials");
            PaymentError::Configuration(format!("missing API keys for {environment} environment"))
        })?;

        let signed = signer::sign(
            method,
            path,
            body,
            credentials,
            self.clock.as_ref(),
            self.random.as_ref(),
        )?;

        let url = format!("{}{}", env_config.base_url.trim_end_matches('/'), signed.path);
        let idempotency = signed.idempotency_key();
        let request = OutboundRequest {
            method,
            url,
            headers: vec![
                ("Content-Type", CONTENT_TYPE_JSON.to_string()),
                (HEADER_ACCESS_KEY, credentials.access_key().to_string()),
                (HEADER_SALT, signed.salt),
                (HEADER_TIMESTAMP, signed.timestamp),
                (HEADER_SIGNATURE, signed.signature),
                (HEADER_IDEMPOTENCY, idempotency),
            ],
            body: (!signed.body.is_empty()).then_some(signed.body),
            timeout: self.config.timeout,
        };

        tracing::debug!(
            environment = %environment,
            method = %method,
            path = %signed.path,
            "dispatching signed request"
        );

        let started = Instant::now();
        let response = self.transport.send(request).await.map_err(|failure| {
            tracing::warn!(
                environment = %environment,
                path = %signed.path,
                error = %failure,
                "gateway unreachable"
            );
            match failure {
                TransportFailure::Timeout => PaymentError::Transport {
                    cause: "request timed out".to_string(),
                    timed_out: true,
                },
                TransportFailure::Network(cause) => PaymentError::Transport {
                    cause,
                    timed_out: false,
                },
            }
        })?;

        tracing::info!(
            environment = %environment,
            method = %method,
            path = %signed.path,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "gateway responded"
        );

        if response.is_success() {
            return unwrap_envelope(&response.body);
        }

        let payload = serde_json::from_slice::<serde_json::Value>(&response.body).unwrap_or_else(
            |_| serde_json::Value::String(String::from_utf8_lossy(&response.body).into_owned()),
        );
        let error = translate_upstream(payload);
        tracing::warn!(
            environment = %environment,
            status = response.status,
            code = %error.code,
            "gateway rejected request"
        );
        Err(PaymentError::GatewayRejection {
            status: response.status,
            error,
        })
    }
}

/// Strip exactly one level of the `{status, data}` envelope.
pub fn unwrap_envelope(body: &[u8]) -> Result<serde_json::Value, PaymentError> {
    let mut envelope: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| PaymentError::UnexpectedResponse(format!("response is not JSON: {e}")))?;

    match envelope.get_mut("data").map(serde_json::Value::take) {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(PaymentError::UnexpectedResponse(
            "no data returned from gateway".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, EnvironmentConfig};
    use crate::signer::{canonical_string, verify_signature, FixedClock, FixedRandom};
    use crate::transport::TransportResponse;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Stub transport: counts calls, records the last request, returns a canned outcome.
    struct StubTransport {
        calls: AtomicUsize,
        last: Mutex<Option<OutboundRequest>>,
        outcome: Result<TransportResponse, TransportFailure>,
    }

    impl StubTransport {
        fn responding(status: u16, body: serde_json::Value) -> Self {
            Self::with_outcome(Ok(TransportResponse {
                status,
                body: serde_json::to_vec(&body).unwrap(),
            }))
        }

        fn with_outcome(outcome: Result<TransportResponse, TransportFailure>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
                outcome,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last(&self) -> OutboundRequest {
            self.last.lock().unwrap().clone().expect("no request sent")
        }
    }

    impl HttpTransport for StubTransport {
        async fn send(
            &self,
            request: OutboundRequest,
        ) -> Result<TransportResponse, TransportFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request);
            self.outcome.clone()
        }
    }

    fn sandbox_only_config() -> GatewayConfig {
        GatewayConfig::new(
            EnvironmentConfig::new(
                Some(Credentials::new("sandbox_ak", "sandbox_sk")),
                "https://sandboxapi.example.net",
            ),
            EnvironmentConfig::new(None, "https://api.example.net"),
        )
    }

    fn dispatcher(stub: StubTransport) -> Dispatcher<StubTransport> {
        Dispatcher::new(sandbox_only_config(), stub)
            .with_sources(FixedClock(1_700_000_000), FixedRandom(vec![0x0f, 0xa1]))
    }

    #[tokio::test]
    async fn test_missing_live_credentials_makes_no_network_call() {
        let d = dispatcher(StubTransport::responding(200, json!({"data": {}})));
        let err = d
            .dispatch(Environment::Live, Method::Post, "/v1/payments", Some(&json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Configuration(ref m) if m.contains("live")));
        assert_eq!(err.http_status(), 500);
        assert_eq!(d.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_success_unwraps_exactly_one_level() {
        let d = dispatcher(StubTransport::responding(
            200,
            json!({
                "status": {"status": "SUCCESS", "error_code": ""},
                "data": {"redirect_url": "https://x", "data": {"nested": true}}
            }),
        ));
        let payload = d
            .dispatch(Environment::Sandbox, Method::Post, "/v1/checkout", Some(&json!({"amount": "1.00"})))
            .await
            .unwrap();
        assert_eq!(payload["redirect_url"], "https://x");
        assert_eq!(payload["data"]["nested"], true);
        assert_eq!(d.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_redirect_url_envelope() {
        let d = dispatcher(StubTransport::responding(
            200,
            json!({"data": {"redirect_url": "https://x"}}),
        ));
        let payload = d
            .dispatch(Environment::Sandbox, Method::Post, "/v1/checkout", None)
            .await
            .unwrap();
        assert_eq!(payload, json!({"redirect_url": "https://x"}));
    }

    #[tokio::test]
    async fn test_headers_and_body_match_signature() {
        let d = dispatcher(StubTransport::responding(200, json!({"data": {"id": "payment_1"}})));
        let body = json!({"amount": "10.00", "currency": "EUR", "capture": true});
        d.dispatch(Environment::Sandbox, Method::Post, "/v1/payments", Some(&body))
            .await
            .unwrap();

        let req = d.transport().last();
        assert_eq!(req.url, "https://sandboxapi.example.net/v1/payments");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("access_key"), Some("sandbox_ak"));
        assert_eq!(req.header("salt"), Some("0fa10fa10fa10fa1"));
        assert_eq!(req.header("timestamp"), Some("1700000000"));
        assert_eq!(req.header("idempotency"), Some("17000000000fa10fa10fa10fa1"));
        assert_eq!(req.timeout, std::time::Duration::from_secs(10));

        let sent_body = req.body.clone().unwrap();
        assert_eq!(sent_body, serde_json::to_string(&body).unwrap());

        let canonical = canonical_string(
            Method::Post,
            "/v1/payments",
            req.header("salt").unwrap(),
            req.header("timestamp").unwrap(),
            "sandbox_ak",
            "sandbox_sk",
            &sent_body,
        );
        assert!(verify_signature(
            b"sandbox_sk",
            &canonical,
            req.header("signature").unwrap()
        ));
    }

    #[tokio::test]
    async fn test_absent_body_is_not_sent() {
        let d = dispatcher(StubTransport::responding(200, json!({"data": []})));
        d.dispatch(Environment::Sandbox, Method::Get, "/v1/data/countries", None)
            .await
            .unwrap();
        assert!(d.transport().last().body.is_none());
    }

    #[tokio::test]
    async fn test_absolute_url_is_reduced_before_sending() {
        let d = dispatcher(StubTransport::responding(200, json!({"data": {}})));
        d.dispatch(
            Environment::Sandbox,
            Method::Get,
            "https://sandboxapi.example.net/v1/payments?x=1",
            None,
        )
        .await
        .unwrap();
        assert_eq!(
            d.transport().last().url,
            "https://sandboxapi.example.net/v1/payments?x=1"
        );
    }

    #[tokio::test]
    async fn test_signed_path_is_the_path_on_the_wire() {
        for input in [
            "/v1/customers?name=José",
            "/v1/a{b}",
            "/v1/x/../payments",
            "https://sandboxapi.example.net/api/v1/payments",
        ] {
            let d = dispatcher(StubTransport::responding(200, json!({"data": {}})));
            d.dispatch(Environment::Sandbox, Method::Get, input, None)
                .await
                .unwrap();

            let req = d.transport().last();
            let wire = reqwest::Url::parse(&req.url).unwrap();
            let wire_path = &wire[url::Position::BeforePath..url::Position::AfterQuery];

            let canonical = canonical_string(
                Method::Get,
                wire_path,
                req.header(HEADER_SALT).unwrap(),
                req.header(HEADER_TIMESTAMP).unwrap(),
                "sandbox_ak",
                "sandbox_sk",
                "",
            );
            assert!(
                verify_signature(
                    b"sandbox_sk",
                    &canonical,
                    req.header(HEADER_SIGNATURE).unwrap()
                ),
                "signature does not cover wire path {wire_path} for input {input}"
            );
        }
    }

    #[test]
    fn test_production_dispatcher_builds() {
        let d = Dispatcher::with_reqwest(sandbox_only_config());
        assert!(d.config().sandbox.has_credentials());
    }

    #[tokio::test]
    async fn test_invalid_path_makes_no_network_call() {
        let d = dispatcher(StubTransport::responding(200, json!({"data": {}})));
        let err = d
            .dispatch(Environment::Sandbox, Method::Post, "/payments", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
        assert_eq!(d.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_rejection_is_translated_with_raw() {
        let upstream = json!({
            "status": {
                "error_code": "CARD_EXPIRED",
                "status": "ERROR",
                "message": "The card is expired.",
                "operation_id": "op_1"
            }
        });
        let d = dispatcher(StubTransport::responding(400, upstream.clone()));
        let err = d
            .dispatch(Environment::Sandbox, Method::Post, "/v1/payments", Some(&json!({})))
            .await
            .unwrap_err();
        match err {
            PaymentError::GatewayRejection { status, error } => {
                assert_eq!(status, 400);
                assert_eq!(error.code, "EXPIRED_CARD");
                assert_eq!(error.raw, Some(upstream));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_rejection_is_unknown() {
        let d = dispatcher(StubTransport::with_outcome(Ok(TransportResponse {
            status: 503,
            body: b"<html>Service Unavailable</html>".to_vec(),
        })));
        let err = d
            .dispatch(Environment::Sandbox, Method::Post, "/v1/payments", None)
            .await
            .unwrap_err();
        let canonical = err.canonical();
        assert_eq!(canonical.code, "UNKNOWN_ERROR");
        assert_eq!(
            canonical.raw,
            Some(json!("<html>Service Unavailable</html>"))
        );
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let d = dispatcher(StubTransport::with_outcome(Err(TransportFailure::Timeout)));
        let err = d
            .dispatch(Environment::Sandbox, Method::Post, "/v1/payments", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Transport { timed_out: true, .. }));
        assert!(err.is_retryable());
        assert_eq!(err.http_status(), 504);
    }

    #[tokio::test]
    async fn test_network_failure_is_transport_error() {
        let d = dispatcher(StubTransport::with_outcome(Err(TransportFailure::Network(
            "connection reset".to_string(),
        ))));
        let err = d
            .dispatch(Environment::Sandbox, Method::Post, "/v1/payments", None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, PaymentError::Transport { ref cause, timed_out: false } if cause == "connection reset")
        );
    }

    #[tokio::test]
    async fn test_success_without_data_is_unexpected() {
        let d = dispatcher(StubTransport::responding(200, json!({"status": {"status": "SUCCESS"}})));
        let err = d
            .dispatch(Environment::Sandbox, Method::Post, "/v1/checkout", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_unwrap_envelope_rejects_non_json() {
        assert!(matches!(
            unwrap_envelope(b"not json"),
            Err(PaymentError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_unwrap_envelope_rejects_null_data() {
        assert!(matches!(
            unwrap_envelope(br#"{"data": null}"#),
            Err(PaymentError::UnexpectedResponse(_))
        ));
    }
}
