#![cfg(not(tarpaulin_include))]

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get},
};
use log::info;
use tokio::{net::TcpListener, signal};

use crate::config::Config;
use crate::handlers::{
    AppState, create_record, delete_record, export_records, health, list_records, record_stats,
    search_records,
};
use crate::store::{self, AttendanceStore};

/// Build the API router around an already opened store
///
/// # Arguments
/// * `store` - Persistence backend shared by all handlers
/// * `body_limit` - Maximum accepted request body size in bytes
pub fn router(store: Arc<dyn AttendanceStore>, body_limit: usize) -> Router {
    let state = AppState::new(store);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/attendance", get(list_records).post(create_record))
        .route("/api/attendance/search", get(search_records))
        .route("/api/attendance/stats", get(record_stats))
        .route("/api/attendance/export", get(export_records))
        .route("/api/attendance/:id", delete(delete_record))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

/// Open the configured database and serve the API until shutdown
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Using {} database", config.driver.name());

    let store_config = config.clone();
    let store = tokio::task::spawn_blocking(move || store::open_store(&store_config)).await??;

    let app = router(store, config.body_limit_bytes);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install terminate handler: {e}");
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
}
