use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_courier::{
    api,
    config::Config,
    object_store::{LocalStore, ObjectStore},
    storage::Database,
    transport::{BotApiTransport, Transport},
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "file-courier starting");

    // Load configuration
    let config = Config::load()?;

    // Initialize the record store
    let db = Database::open(&config.node.data_dir)?;
    info!("Record store opened at: {}", config.node.data_dir);

    // Blob stores: the live pool and the backup area
    let pool_store: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(&config.storage.pool_path)?);
    info!("File pool at: {}", config.storage.pool_path);

    let backup_store: Arc<dyn ObjectStore> =
        Arc::new(LocalStore::new(&config.storage.backup_path)?);
    info!("Backup area at: {}", config.storage.backup_path);

    // Transport to the chat platform
    let transport: Arc<dyn Transport> = Arc::new(BotApiTransport::new(
        &config.transport.api_base,
        &config.transport.token,
    ));
    info!("Transport ready: {}", config.transport.api_base);

    // Create shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        pool_store,
        backup_store,
        transport,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.node.bind_address).await?;
    info!("Listening on: {}", config.node.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
