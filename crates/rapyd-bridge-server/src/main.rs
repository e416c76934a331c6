use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use rapyd::ReqwestTransport;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rapyd_server::{config::ServerConfig, metrics::register_metrics, routes, state::AppState};

/// Inbound payment bodies are small; anything larger is refused before parsing.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env().expect("Failed to load configuration");
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;

    tracing::info!("Starting rapyd-bridge on port {}", port);
    tracing::info!(
        sandbox = %config.gateway.sandbox.base_url,
        live = %config.gateway.live.base_url,
        timeout_secs = config.gateway.timeout.as_secs(),
        "Gateway endpoints"
    );
    tracing::info!("Allowed origins: {:?}", allowed_origins);
    tracing::info!("Rate limit: {} req/min per IP", rate_limit_rpm);

    // Register Prometheus metrics
    register_metrics();

    // Create shared state
    let state_data = web::Data::new(AppState::new(config));

    // Configure rate limiter
    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm)
        .finish()
        .expect("Failed to create rate limiter config");

    HttpServer::new(move || {
        let cors = rapyd_server::cors::build_cors(&allowed_origins);

        App::new()
            .app_data(state_data.clone())
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Governor::new(&governor_conf))
            .configure(routes::health::configure::<ReqwestTransport>)
            .configure(routes::payments::configure::<ReqwestTransport>)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
