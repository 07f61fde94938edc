use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use subjob_core::executor::JobQueue;
use subjob_core::session::{InMemorySessionStore, SessionStore};
use subjob_worker::{ChannelJobQueue, DetachedJobQueue, ImmediateRunner, WorkerPool};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subjob_api::background::session_expiry;
use subjob_api::config::{ExecutorKind, ServerConfig};
use subjob_api::router::build_app_router;
use subjob_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "subjob_api=debug,subjob_worker=debug,subjob_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        executor = ?config.executor,
        debug = config.debug,
        "Loaded server configuration"
    );

    // --- Session store ---
    let sessions: Arc<dyn SessionStore> =
        Arc::new(InMemorySessionStore::new(config.provenance.clone()));

    let cancel = CancellationToken::new();

    // --- Subjob executor ---
    let (job_queue, pool_handle): (Arc<dyn JobQueue>, _) = match config.executor {
        ExecutorKind::None => {
            tracing::info!("No subjob executor configured; submitted jobs stay pending");
            (Arc::new(DetachedJobQueue), None)
        }
        ExecutorKind::Immediate => {
            let (queue, rx) = ChannelJobQueue::new();
            let pool = WorkerPool::new(
                Arc::clone(&sessions),
                Arc::new(ImmediateRunner),
                config.worker_concurrency,
            );
            let handle = tokio::spawn(pool.run(rx, cancel.clone()));
            (Arc::new(queue), Some(handle))
        }
    };

    // --- Session expiry ---
    let expiry_handle = (config.session_idle_ttl_secs > 0).then(|| {
        tokio::spawn(session_expiry::run(
            Arc::clone(&sessions),
            Duration::from_secs(config.session_idle_ttl_secs),
            session_expiry::PURGE_INTERVAL,
            cancel.clone(),
        ))
    });

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        sessions,
        job_queue,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting callback server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    cancel.cancel();

    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if let Some(handle) = pool_handle {
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Worker pool did not drain before the shutdown timeout");
        }
    }
    if let Some(handle) = expiry_handle {
        let _ = tokio::time::timeout(grace, handle).await;
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
