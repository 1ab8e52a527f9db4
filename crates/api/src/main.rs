use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use imagegen_cloud::{BlobStore, S3BlobStore};
use imagegen_db::{JobStore, MemoryJobStore, PgJobStore};
use imagegen_runninghub::RunningHubApi;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imagegen_api::background::reconcile_sweep;
use imagegen_api::config::ServerConfig;
use imagegen_api::router::build_app_router;
use imagegen_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imagegen_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Job store ---
    let store: Arc<dyn JobStore> = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = imagegen_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            imagegen_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            imagegen_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgJobStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; job records are kept in memory only");
            Arc::new(MemoryJobStore::new())
        }
    };

    // --- RunningHub client ---
    let rh = &config.runninghub;
    let runninghub = RunningHubApi::new(
        rh.api_key.clone(),
        rh.endpoints.clone(),
        Duration::from_secs(rh.timeout_secs),
    )
    .expect("Failed to build RunningHub HTTP client")
    .with_webhook_url(rh.webhook_url.clone());
    match &rh.webhook_url {
        Some(url) => tracing::info!(webhook_url = %url, "RunningHub webhook enabled"),
        None => tracing::info!("RUNNINGHUB_WEBHOOK_URL not set; relying on polling"),
    }

    // --- Blob store ---
    let blob_store: Option<Arc<dyn BlobStore>> = match &config.blob {
        Some(blob) => {
            let s3 = S3BlobStore::from_env(
                blob.bucket.clone(),
                blob.prefix.clone(),
                blob.public_base_url.clone(),
            )
            .await;
            tracing::info!(bucket = %blob.bucket, "S3 blob store configured for input images");
            Some(Arc::new(s3))
        }
        None => None,
    };

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        runninghub: Arc::new(runninghub),
        blob_store,
    };

    // --- Reconcile sweep ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = config.reconcile_interval_secs.map(|secs| {
        tokio::spawn(reconcile_sweep::run(
            state.clone(),
            Duration::from_secs(secs),
            sweep_cancel.clone(),
        ))
    });

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    if let Some(handle) = sweep_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Reconcile sweep stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
