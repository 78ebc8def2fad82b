//! Reconciliation Engine Binary
//!
//! Starts the payment status reconciliation daemon: the sweep poller, the
//! orphan recovery cadence, and the operational HTTP API.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin reconciliation-engine
//! ```
//!
//! # Environment Variables
//!
//! - `RECON_CONFIG`: Path to a YAML config file (optional, defaults apply)
//! - `HTTP_PORT`: HTTP server port (default: 8086)
//! - `GATEWAY_URL`: Payment gateway base URL (default: <http://localhost:9470>)
//! - `GATEWAY_TOKEN`: Bearer token for the gateway API (optional)
//! - `DATABASE_PATH`: Turso database file (default: data/payments.db)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use reconciliation_engine::application::services::ReconciliationPoller;
use reconciliation_engine::application::use_cases::{RecoverOrphansUseCase, SyncStatusUseCase};
use reconciliation_engine::config::{Config, load_config};
use reconciliation_engine::domain::recovery::default_matchers;
use reconciliation_engine::infrastructure::events::BroadcastEventBus;
use reconciliation_engine::infrastructure::gateway::HttpGatewayClient;
use reconciliation_engine::infrastructure::http::{AppState, create_router};
use reconciliation_engine::infrastructure::persistence::TursoPaymentStore;
use reconciliation_engine::resilience::{CircuitBreaker, Clock, SystemClock};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Concrete type alias for the sync use case.
type ConcreteSyncUseCase =
    SyncStatusUseCase<HttpGatewayClient, TursoPaymentStore, BroadcastEventBus>;

/// Concrete type alias for the recovery use case.
type ConcreteRecoveryUseCase = RecoverOrphansUseCase<TursoPaymentStore, BroadcastEventBus>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    tracing::info!("Starting Remedi Reconciliation Engine");

    let config = parse_config()?;
    log_config(&config);

    let store = Arc::new(TursoPaymentStore::connect(&config.persistence.database_path).await?);
    let gateway = Arc::new(HttpGatewayClient::new(&config.gateway.to_client_config())?);
    let event_bus = Arc::new(BroadcastEventBus::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sync: Arc<ConcreteSyncUseCase> = Arc::new(SyncStatusUseCase::new(
        Arc::clone(&gateway),
        Arc::clone(&store),
        Arc::clone(&event_bus),
    ));
    let recovery: Arc<ConcreteRecoveryUseCase> = Arc::new(RecoverOrphansUseCase::new(
        Arc::clone(&store),
        Arc::clone(&event_bus),
        default_matchers(config.recovery.match_window()),
        config.recovery.to_recovery_options(),
    ));

    // Cancellation token coordinates poller and scheduled-check teardown.
    let shutdown_token = CancellationToken::new();

    let breaker = CircuitBreaker::new(config.breaker.to_breaker_config(), Arc::clone(&clock));
    let (poller, poller_handle) = ReconciliationPoller::new(
        config.poller.to_poller_config(),
        Arc::clone(&sync),
        Arc::clone(&recovery),
        Arc::clone(&store),
        Arc::clone(&event_bus),
        breaker,
        clock,
        shutdown_token.clone(),
    );
    let poller_task = poller.spawn();
    tracing::info!("Reconciliation poller started");

    let http_handle = start_http_server(&config, sync, recovery, poller_handle).await?;

    tracing::info!("Reconciliation engine ready");

    http_handle.await?;
    shutdown_token.cancel();
    poller_task.await?;

    tracing::info!("Reconciliation engine stopped");
    Ok(())
}

/// Initialize the tracing subscriber with environment filter.
///
/// Uses a static directive string that is a compile-time constant
/// guaranteed to parse.
#[allow(clippy::expect_used)]
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "reconciliation_engine=info"
                    .parse()
                    .expect("static directive 'reconciliation_engine=info' is valid"),
            ),
        )
        .init();
}

/// Load configuration and apply environment overrides.
fn parse_config() -> anyhow::Result<Config> {
    let config_path = std::env::var("RECON_CONFIG").ok();
    let mut config = load_config(config_path.as_deref())?;

    if let Ok(port) = std::env::var("HTTP_PORT")
        && let Ok(port) = port.parse()
    {
        config.server.http_port = port;
    }
    if let Ok(url) = std::env::var("GATEWAY_URL") {
        config.gateway.base_url = url;
    }
    if let Ok(token) = std::env::var("GATEWAY_TOKEN") {
        config.gateway.api_token = Some(token);
    }
    if let Ok(path) = std::env::var("DATABASE_PATH") {
        config.persistence.database_path = path;
    }

    Ok(config)
}

/// Log the effective configuration.
fn log_config(config: &Config) {
    tracing::info!(
        http_port = config.server.http_port,
        gateway_url = %config.gateway.base_url,
        database_path = %config.persistence.database_path,
        sweep_interval_secs = config.poller.sweep_interval_secs,
        breaker_threshold = config.breaker.failure_threshold,
        "Configuration loaded"
    );
}

/// Start the HTTP server with graceful shutdown support.
async fn start_http_server(
    config: &Config,
    sync: Arc<ConcreteSyncUseCase>,
    recovery: Arc<ConcreteRecoveryUseCase>,
    poller: reconciliation_engine::application::services::PollerHandle,
) -> anyhow::Result<JoinHandle<()>> {
    let state = AppState {
        sync,
        recovery,
        poller,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let app = create_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.server.http_port).parse()?;

    tracing::info!(%addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  POST /api/v1/payments/{{order_code}}/sync");
    tracing::info!("  GET  /api/v1/orphans/count");
    tracing::info!("  POST /api/v1/orphans/recover");
    tracing::info!("  POST /api/v1/notifications");

    let listener = TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    let handle = tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::error!("HTTP server error: {e}");
        }
    });

    Ok(handle)
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed; failing fast at startup
/// beats a process that cannot respond to termination signals.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
