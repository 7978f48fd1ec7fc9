//! Axum-based HTTP server publishing the inverter snapshot
//!
//! Handlers only read the latest [`PublicSnapshot`] from the watch channel;
//! they never touch the engine.

use crate::engine::PublicSnapshot;
use crate::error::{Result, SolaxError};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub snapshot_rx: watch::Receiver<Arc<PublicSnapshot>>,
}

impl AppState {
    pub fn new(snapshot_rx: watch::Receiver<Arc<PublicSnapshot>>) -> Self {
        Self { snapshot_rx }
    }

    fn snapshot(&self) -> Arc<PublicSnapshot> {
        self.snapshot_rx.borrow().clone()
    }
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// The public inverter document
pub async fn inverter(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.snapshot().to_document())
}

pub async fn diagnostics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.snapshot().diagnostics())
}

pub async fn faults(State(state): State<AppState>) -> impl IntoResponse {
    let snap = state.snapshot();
    Json(serde_json::json!({
        "error_bits": snap.live_data.error_bits,
        "faults": snap.active_faults(),
    }))
}

/// Server-sent events: one `inverter` event per published snapshot
pub async fn events(State(state): State<AppState>) -> impl IntoResponse {
    let stream = WatchStream::new(state.snapshot_rx.clone()).map(|snap| {
        Ok::<Event, std::convert::Infallible>(
            Event::default()
                .event("inverter")
                .data(snap.to_document().to_string()),
        )
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(inverter))
        .route("/api/inverter", get(inverter))
        .route("/api/health", get(health))
        .route("/api/diagnostics", get(diagnostics))
        .route("/api/faults", get(faults))
        .route("/api/events", get(events))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(
    snapshot_rx: watch::Receiver<Arc<PublicSnapshot>>,
    host: &str,
    port: u16,
) -> Result<()> {
    let router = build_router(AppState::new(snapshot_rx));

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 0.0.0.0", host));
            ([0, 0, 0, 0], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SolaxError::web(format!("Cannot bind {}: {}", addr, e)))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| SolaxError::web(e.to_string()))?;
    logger.info(&format!(
        "Web server listening at http://{}:{}",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router)
        .await
        .map_err(|e| SolaxError::web(e.to_string()))
}
