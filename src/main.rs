//! Taskguard - caching, rate limiting and background jobs for a task API

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskguard::background::spawn_overdue_scanner;
use taskguard::jobs::InMemoryJobQueue;
use taskguard::store::{InMemoryTaskStore, TaskStore};
use taskguard::{create_router, AppState, Config, JobProcessor, JobWorker};

/// Main entry point for the task server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the store, job queue and worker
/// 4. Start the cache sweep and the overdue scanner
/// 5. Serve HTTP until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskguard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Taskguard server");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        cache_max_size = config.cache_max_size,
        cache_ttl_seconds = config.cache_ttl_seconds,
        rate_limit = config.rate_limit.limit,
        rate_limit_window_ms = config.rate_limit.window_ms,
        job_concurrency = config.job_concurrency,
        "Configuration loaded"
    );

    let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());

    let (queue, jobs) = InMemoryJobQueue::new(config.job_queue_capacity);
    let processor = Arc::new(JobProcessor::with_builtin_handlers(store.clone()));
    let worker_handle = JobWorker::new(processor, config.job_concurrency)
        .with_retry_delay(Duration::from_millis(config.job_retry_delay_ms))
        .spawn(queue.clone(), jobs);
    let queue = Arc::new(queue);

    let state = AppState::from_config(&config, store.clone(), queue.clone());
    state
        .cache
        .start_sweep(Duration::from_millis(config.cache_sweep_interval_ms));

    let scanner_handle = spawn_overdue_scanner(
        store,
        queue,
        Duration::from_secs(config.overdue_scan_interval_secs),
    );

    let cache = state.cache.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(vec![worker_handle, scanner_handle]))
    .await
    .context("server error")?;

    cache.stop_sweep();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts `background`.
async fn shutdown_signal(background: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for handle in background {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
