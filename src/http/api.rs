//! Axum handlers for the `/chat` and `/docsearch` routes.
//!
//! Both routes share one lifecycle: extract the caller identity, validate
//! the JSON body, dispatch to the registry, and map failures onto the
//! response taxonomy. Unknown approaches are a client error and are not
//! logged as failures; everything else that goes wrong inside a handler is
//! logged with category/user/error context and surfaced as a 500.

use axum::{
    Json,
    extract::State,
    extract::rejection::JsonRejection,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::approaches::{ApproachKind, Overrides, Turn};
use crate::auth::identify;
use crate::error::GatewayError;

use super::{AppState, write_error};

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct ApproachRequest {
    approach: String,
    history: Vec<Turn>,
    #[serde(default)]
    overrides: Option<Overrides>,
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /chat
pub(super) async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ApproachRequest>, JsonRejection>,
) -> Response {
    run_approach(ApproachKind::Chat, state, headers, body).await
}

/// POST /docsearch
pub(super) async fn docsearch(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ApproachRequest>, JsonRejection>,
) -> Response {
    run_approach(ApproachKind::DocSearch, state, headers, body).await
}

async fn run_approach(
    kind: ApproachKind,
    state: AppState,
    headers: HeaderMap,
    body: Result<Json<ApproachRequest>, JsonRejection>,
) -> Response {
    let user = identify(&headers, &state.identity_header);

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };

    let result = state
        .registry
        .dispatch(
            kind,
            &request.approach,
            &user.name,
            &request.history,
            request.overrides.as_ref(),
        )
        .await;

    match result {
        Ok(value) => Json(value).into_response(),
        Err(GatewayError::UnknownApproach) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unknown approach" })),
        )
            .into_response(),
        Err(GatewayError::BadRequest(message)) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
        }
        Err(e) => {
            write_error(kind.as_str(), &user.name, &e.to_string());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Map a body-extraction failure onto the response taxonomy: a missing or
/// wrong content type is 415, everything else (malformed JSON, shape
/// mismatch) is a 400 with the extractor's description.
fn rejection_response(rejection: JsonRejection) -> Response {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(json!({ "error": "request must be json" })),
        )
            .into_response(),
        other => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": other.body_text() })),
        )
            .into_response(),
    }
}
