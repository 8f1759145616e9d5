use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kannada_backend::translate;
use kannada_backend::{create_app, AppState, Config};

const DEFAULT_LOG_FILTER: &str = "kannada_backend=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (config, config_path) = Config::load()?;
    info!("Loaded configuration (file: {})", config_path);

    // A model that fails to load only disables /translate.
    let model = translate::bootstrap(&config.translator_config);
    if !model.is_loaded() {
        info!("Starting in degraded mode, translation is unavailable");
    }

    let host = config.system_config.host.clone();
    let port = config.system_config.port;
    let app = create_app(AppState::new(model));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    info!("Starting server on {}", listener.local_addr()?);
    info!("  POST /translate     - English to Kannada translation");
    info!("  POST /sos/alert     - Record an SOS alert");
    info!("  GET  /admin/stats   - Alert statistics");
    info!("  GET  /health        - Liveness and model status");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
