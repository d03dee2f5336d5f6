//! HTTP router and handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::Dispatcher;
use crate::error::rpc_codes;

/// Shared application state
pub struct AppState {
    /// Request handler
    pub dispatcher: Arc<Dispatcher>,
}

/// Create the router
pub fn create_router(state: Arc<AppState>, max_body_size: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/mcp", post(mcp_handler))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "tools": state.dispatcher.registry().len(),
    }))
}

/// POST /mcp - one JSON-RPC message per request body
async fn mcp_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let caller = caller_key(&headers, peer);
    let response = state.dispatcher.handle(&body, &caller);

    if response.error_code() == Some(rpc_codes::RATE_LIMITED) {
        let retry_after = state.dispatcher.retry_after().as_secs_f64().ceil();
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, format!("{retry_after}"))],
            Json(response),
        )
            .into_response();
    }

    (StatusCode::OK, Json(response)).into_response()
}

/// Identity charged for a request: the first `X-Forwarded-For` hop when a
/// proxy supplied one, otherwise the socket peer address.
fn caller_key(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| peer.ip().to_string(), String::from)
}
