//! Visit engine server.
//!
//! Loads configuration, wires PostgreSQL stores, the payment gateway and the
//! notification publisher into a `VisitEngine`, runs the sweeper in the
//! background, and serves the REST API until interrupted.

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method};
use secrecy::SecretString;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use visit_engine::adapters::http::{visit_router, VisitAppState};
use visit_engine::adapters::{
    HttpGatewayConfig, HttpPaymentGateway, MockPaymentGateway, PostgresAppointmentRepository,
    PostgresPaymentRepository, PostgresSlotLedger, PostgresTokenRepository, RedisEventPublisher,
    SystemClock, TracingEventPublisher,
};
use visit_engine::application::{SweeperConfig, VisitContext, VisitEngine, VisitSweeper};
use visit_engine::config::{AppConfig, ServerConfig};
use visit_engine::ports::{EventPublisher, PaymentGateway};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let engine = Arc::new(VisitEngine::new(VisitContext::new(
        Arc::new(PostgresAppointmentRepository::new(pool.clone())),
        Arc::new(PostgresPaymentRepository::new(pool.clone())),
        Arc::new(PostgresTokenRepository::new(pool.clone())),
        Arc::new(PostgresSlotLedger::new(pool.clone())),
        build_gateway(&config)?,
        build_publisher(&config).await,
        Arc::new(SystemClock),
        config.engine_config()?,
    )));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = VisitSweeper::with_config(
        engine.clone(),
        SweeperConfig::default().with_interval(config.scheduling.sweep_interval()),
    );
    let sweeper_task = tokio::spawn(async move { sweeper.run(shutdown_rx).await });

    let app = visit_router()
        .with_state(VisitAppState::new(engine))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Visit engine listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper_task.await {
        tracing::error!(error = %e, "Sweeper task ended abnormally");
    }
    tracing::info!("Visit engine stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_level.clone()));

    if server.wants_json_logs() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_gateway(config: &AppConfig) -> Result<Arc<dyn PaymentGateway>, BoxError> {
    let gateway = &config.gateway;
    if gateway.is_mock() {
        tracing::warn!("Using the in-process mock payment gateway");
        return Ok(Arc::new(MockPaymentGateway::new()));
    }

    let secret: SecretString = gateway
        .key_secret
        .clone()
        .ok_or("gateway.key_secret is required for a hosted gateway")?;
    let http = HttpPaymentGateway::new(
        HttpGatewayConfig::new(gateway.provider.clone(), gateway.key_id.clone(), secret)
            .with_base_url(gateway.base_url.clone())
            .with_timeout(gateway.request_timeout()),
    )?;
    Ok(Arc::new(http))
}

/// Redis when configured and reachable, otherwise notifications only reach
/// the logs.
async fn build_publisher(config: &AppConfig) -> Arc<dyn EventPublisher> {
    if !config.redis.is_enabled() {
        return Arc::new(TracingEventPublisher::new());
    }

    match RedisEventPublisher::connect(&config.redis.url, config.redis.channel_prefix.clone()).await {
        Ok(publisher) => Arc::new(publisher),
        Err(e) => {
            tracing::error!(error = %e, "Redis unavailable; notifications will only be logged");
            Arc::new(TracingEventPublisher::new())
        }
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static("x-patient-id"),
            HeaderName::from_static("x-staff-id"),
        ])
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
