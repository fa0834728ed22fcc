//! Demo mode middleware that blocks write operations.

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::SharedState;

/// Rejects write operations (POST/PUT/DELETE/PATCH) in demo mode.
/// The OAuth flow is exempted so visitors can still log in.
pub async fn demo_guard(
    State(state): State<SharedState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.demo_mode {
        return next.run(request).await;
    }

    let is_read_only = matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    );
    let is_oauth_endpoint = request.uri().path().starts_with("/oauth");

    if is_read_only || is_oauth_endpoint {
        return next.run(request).await;
    }

    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "Write operations are disabled in the demo instance."
        })),
    )
        .into_response()
}
