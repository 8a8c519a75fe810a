//! Static routes: entry page, favicon, asset tree.
//!
//! Files come from the configured static directory. When no built frontend
//! is present the root falls back to an inline status page, so a bare
//! gateway still answers `GET /` with something useful.

use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use super::AppState;

/// Fallback page served at `/` when the static build is absent.
const FALLBACK_INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Nelum</title>
  <style>
    *, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: system-ui, -apple-system, sans-serif;
      background: #0f0f0f; color: #e0e0e0;
      display: flex; align-items: center; justify-content: center;
      height: 100vh;
    }
    .card {
      text-align: center; padding: 2rem 3rem;
      border: 1px solid #333; border-radius: 12px;
      background: #1a1a1a;
    }
    h1 { font-size: 1.5rem; margin-bottom: 0.5rem; }
    p  { font-size: 0.9rem; color: #888; }
    code { color: #c0c0e0; }
  </style>
</head>
<body>
  <div class="card">
    <h1>Nelum</h1>
    <p>Gateway is running.</p>
    <p>POST <code>/chat</code> or <code>/docsearch</code> to talk to it.</p>
  </div>
</body>
</html>
"#;

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET / — static entry page, or the inline fallback.
pub(super) async fn index(State(state): State<AppState>) -> Response {
    match read_static(&state.static_dir, "index.html").await {
        Some(bytes) => Html(bytes).into_response(),
        None => Html(FALLBACK_INDEX_HTML).into_response(),
    }
}

/// GET /favicon.ico — 204 when no icon is shipped.
pub(super) async fn favicon(State(state): State<AppState>) -> Response {
    match read_static(&state.static_dir, "favicon.ico").await {
        Some(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/x-icon")],
            bytes,
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// GET /assets/{*path} — 404 when missing.
pub(super) async fn asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    if !is_safe_path(&path) {
        return StatusCode::NOT_FOUND.into_response();
    }

    match read_static(&state.static_dir, &format!("assets/{path}")).await {
        Some(bytes) => {
            let mime = mime_guess::from_path(&path)
                .first_raw()
                .unwrap_or("application/octet-stream");
            (StatusCode::OK, [(header::CONTENT_TYPE, mime)], bytes).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Reject anything that could escape the asset tree.
fn is_safe_path(path: &str) -> bool {
    !path.split(['/', '\\']).any(|segment| segment == "..") && !path.starts_with('/')
}

async fn read_static(dir: &PathBuf, relative: &str) -> Option<Vec<u8>> {
    tokio::fs::read(dir.join(relative)).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_segments_are_rejected() {
        assert!(!is_safe_path("../secrets.txt"));
        assert!(!is_safe_path("nested/../../etc/passwd"));
        assert!(!is_safe_path("/absolute"));
    }

    #[test]
    fn ordinary_paths_pass() {
        assert!(is_safe_path("app.js"));
        assert!(is_safe_path("css/site.css"));
        assert!(is_safe_path("img/logo..png")); // dots inside a name are fine
    }
}
