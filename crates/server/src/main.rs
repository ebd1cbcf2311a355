//! Binary entry point for the book server.
//!
//! Serves the book API and, when cover enrichment is enabled, runs the cover
//! worker in the same process until shutdown.

use tokio::signal;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bookshelf_core::config::AppConfig;
use bookshelf_core::pipeline::CoverPipeline;
use bookshelf_server::{api_routes, config::ServerConfig, storage::Stores, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ServerConfig::from_env();
    let app_config = AppConfig::from_env()?;
    let stores = Stores::open(&config.data_path)?;
    tracing::info!(path = %config.data_path.display(), "opened stores");

    let CoverPipeline { trigger, worker } = CoverPipeline::from_config(&app_config, stores.books.clone())?;
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let worker = worker.map(|w| {
        w.spawn(async move {
            let _ = shutdown_rx.changed().await;
        })
    });

    let state = AppState::new(config.clone(), stores, trigger);
    let app = api_routes(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Book server listening on {}", config.bind_addr());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker {
        match handle.await {
            Ok(stats) => tracing::info!(?stats, "cover worker finished"),
            Err(e) => tracing::error!(error = %e, "cover worker aborted"),
        }
    }
    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bookshelf_server=info,bookshelf_core=info,tower_http=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
