//! HTTP front — routes inbound requests to the approach registry, the
//! content proxy and the static pages.
//!
//! ## URL layout
//!
//! ```text
//! GET  /                 — entry page
//! GET  /favicon.ico      — icon (204 when no static icon exists)
//! GET  /assets/{*path}   — static asset bytes
//! GET  /content/{path}   — stored content file (size-gated)
//! POST /chat             — chat approaches
//! POST /docsearch        — document-search approaches
//! ```
//!
//! Every request passes the token-freshness guard before reaching its
//! handler. Failures are converted to structured JSON error responses at
//! this boundary; nothing below it retries.

mod api;
mod content;
mod ui;

pub use content::{MAX_PREVIEW_BYTES, ServedFile, serve_blob};

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::approaches::ApproachRegistry;
use crate::auth::TokenCell;
use crate::clients::blob::BlobStore;
use crate::error::GatewayError;

// ── Shared request state ──────────────────────────────────────────────────────

/// Axum router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — all fields are reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Approach registry, built once at startup.
    pub registry: Arc<ApproachRegistry>,
    /// Completion-service bearer token cell.
    pub token: Arc<TokenCell>,
    /// Blob store backing the content proxy.
    pub blob: Arc<BlobStore>,
    /// Header name carrying the edge-validated identity token.
    pub identity_header: Arc<str>,
    /// Directory holding the entry page, favicon and `assets/` tree.
    pub static_dir: Arc<PathBuf>,
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::index))
        .route("/favicon.ico", get(ui::favicon))
        .route("/assets/{*path}", get(ui::asset))
        .route("/content/{path}", get(content::content_file))
        .route("/chat", post(api::chat))
        .route("/docsearch", post(api::docsearch))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ensure_token_fresh,
        ))
        .with_state(state)
}

/// Pre-request guard: refresh the completion-service token when less than
/// a minute of validity remains. A failed refresh fails the request.
async fn ensure_token_fresh(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(e) = state.token.ensure_fresh().await {
        error!(error = %e, "bearer token refresh failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response();
    }
    next.run(request).await
}

/// Structured failure record at the request boundary — the fields feed
/// downstream triage, the event is not replayed or queued.
pub(crate) fn write_error(category: &str, user: &str, error: &str) {
    error!(category, user, error, "request failed");
}

// ── Server loop ───────────────────────────────────────────────────────────────

/// Bind and serve until `shutdown` is cancelled.
pub async fn serve(
    bind: &str,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), GatewayError> {
    let router = build_router(state);

    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| GatewayError::Config(format!("bind failed on {bind}: {e}")))?;

    info!(%bind, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(GatewayError::Io)?;

    info!("gateway shut down");
    Ok(())
}
