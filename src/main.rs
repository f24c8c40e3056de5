//! RTSP Control Server
//!
//! Main entry point.

use rtsp_control::{
    control_api::ControlApi,
    device_controller::{DeviceController, DeviceControllerConfig},
    location_registry::LocationRegistry,
    process_supervisor::{BinaryResolver, ProcessSupervisor, ProcessSupervisorConfig},
    relay_supervisor::{RelayConfig, RelaySupervisor},
    state::{AppConfig, AppState},
    web_api,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rtsp_control=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting RTSP Control Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        locations_file = %config.locations_file.display(),
        recordings_dir = %config.recordings_dir.display(),
        relay_log_dir = %config.relay_log_dir.display(),
        recording_chain = config.recording_chain.as_str(),
        termination_grace_ms = config.termination_grace.as_millis() as u64,
        "Configuration loaded"
    );

    // Initialize components
    let registry = Arc::new(LocationRegistry::from_file(&config.locations_file)?);
    tracing::info!(
        sources = registry.sources().len(),
        cameras = registry.cameras().len(),
        servers = registry.servers().len(),
        "LocationRegistry loaded"
    );

    let resolver = BinaryResolver::from_path_list(&config.binary_fallback_dirs);
    let supervisor = Arc::new(ProcessSupervisor::new(
        ProcessSupervisorConfig {
            recordings_dir: config.recordings_dir.clone(),
            recording_chain: config.recording_chain,
            termination_grace: config.termination_grace,
        },
        resolver,
    ));
    tracing::info!("ProcessSupervisor initialized");

    let relay = Arc::new(RelaySupervisor::new(
        RelayConfig {
            endpoint: config.relay_endpoint.clone(),
            log_dir: config.relay_log_dir.clone(),
            cooldown: config.relay_cooldown,
        },
        supervisor.clone(),
    ));
    tracing::info!(
        cooldown_secs = config.relay_cooldown.as_secs(),
        "RelaySupervisor initialized"
    );

    let devices = Arc::new(DeviceController::new(DeviceControllerConfig {
        camera_credentials: config.camera_credentials.clone(),
        bridge_credentials: config.bridge_credentials.clone(),
        visca_port: config.visca_port,
        timeout: config.device_timeout,
    })?);
    tracing::info!("DeviceController initialized");

    let control = Arc::new(ControlApi::new(
        registry,
        supervisor,
        relay,
        devices,
        config.default_bitrate_kbps,
    ));

    let state = AppState::new(control.clone());

    let app = web_api::create_router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, terminating managed processes");
    control.shutdown().await;

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
