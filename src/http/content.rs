//! Content proxy — serves stored files from within the gateway so the
//! frontend needs no direct storage access.
//!
//! No per-object authorization happens here: every stored object is
//! reachable by every caller, so the container must hold only content all
//! users may see. Each object is also buffered whole in memory, which is
//! why [`MAX_PREVIEW_BYTES`] exists — anything at or over the cutoff gets
//! an oversize notice instead of bytes.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

use crate::auth::identify;
use crate::clients::blob::BlobStore;
use crate::error::GatewayError;

use super::{AppState, write_error};

/// Objects at or over this size are refused with an oversize notice.
pub const MAX_PREVIEW_BYTES: u64 = 1024 * 1024;

/// Extensions always served as attachments (office documents the browser
/// would otherwise try, and fail, to render inline).
const ATTACHMENT_EXTENSIONS: [&str; 6] = ["doc", "docs", "xls", "xlsx", "ppt", "pptx"];

/// A file ready to send back: bytes, resolved MIME type, disposition.
#[derive(Debug)]
pub struct ServedFile {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub as_attachment: bool,
}

// ── Handler ───────────────────────────────────────────────────────────────────

/// GET /content/{path}
pub(super) async fn content_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let path = path.trim();

    match serve_blob(&state.blob, path).await {
        Ok(file) => {
            let disposition = if file.as_attachment {
                format!("attachment; filename=\"{}\"", sanitize_filename(path))
            } else {
                "inline".to_string()
            };
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, file.mime),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                file.bytes,
            )
                .into_response()
        }
        Err(GatewayError::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(GatewayError::Oversize { size }) => {
            (StatusCode::FORBIDDEN, Html(oversize_notice(size))).into_response()
        }
        Err(e) => {
            let user = identify(&headers, &state.identity_header);
            write_error("content", &user.name, &e.to_string());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

// ── Serving policy ────────────────────────────────────────────────────────────

/// Fetch `path` from the store, applying the size gate and MIME policy.
pub async fn serve_blob(blob: &BlobStore, path: &str) -> Result<ServedFile, GatewayError> {
    let properties = blob.properties(path).await?;

    if properties.size >= MAX_PREVIEW_BYTES {
        return Err(GatewayError::Oversize { size: properties.size });
    }

    // No content type on record means the object was never finalised.
    let Some(mut mime) = properties.content_type else {
        return Err(GatewayError::NotFound);
    };

    // The generic placeholder is worth a second look at the extension.
    if mime == "application/octet-stream" {
        mime = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();
    }

    let as_attachment = extension(path)
        .map(|ext| ATTACHMENT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    let bytes = blob.download(path).await?;

    Ok(ServedFile { bytes, mime, as_attachment })
}

fn extension(path: &str) -> Option<&str> {
    std::path::Path::new(path).extension()?.to_str()
}

/// Keep the download filename header-safe.
fn sanitize_filename(path: &str) -> String {
    path.chars()
        .map(|c| if c == '"' || c.is_control() { '_' } else { c })
        .collect()
}

fn oversize_notice(size: u64) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>oversize file</title></head><body>\
         <p>Subject file cannot be previewed due to the size limit, {size} bytes. \
         See [Supporting content] tab.</p></body></html>"
    )
}
