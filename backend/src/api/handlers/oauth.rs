//! ORCID OAuth login flow.
//!
//! `GET /oauth/authorize` redirects the browser to the ORCID registry with a
//! random anti-CSRF state (mirrored in a short-lived cookie). The registry
//! sends the user back to `GET /oauth/callback`, which exchanges the code,
//! upserts the user row, kicks off a background profile sync and redirects
//! to the frontend with a session cookie set. Error paths always land back
//! on the frontend with an `error` query parameter instead of a bare 500.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use rand::RngExt;
use serde::Deserialize;
use serde_json::json;

use crate::api::middleware::auth::{mint_session, session_cookie};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::orcid_client::{is_valid_orcid_id, normalize_orcid_id};
use crate::services::profile_sync_service::SyncOptions;

const STATE_COOKIE: &str = "sh_oauth_state";

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/authorize", get(authorize))
        .route("/callback", get(callback))
        .route("/status", get(status))
}

/// GET /oauth/authorize
async fn authorize(State(state): State<SharedState>) -> Result<Response> {
    let nonce: [u8; 16] = rand::rng().random();
    let csrf_state = hex::encode(nonce);

    let url = state
        .oauth
        .authorization_url(&state.config.orcid_authorize_url(), &csrf_state)?;

    let state_cookie = format!(
        "{}={}; Path=/oauth; HttpOnly; SameSite=Lax; Max-Age=600",
        STATE_COOKIE, csrf_state
    );
    Ok((
        [(header::SET_COOKIE, state_cookie)],
        Redirect::temporary(&url),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /oauth/callback
async fn callback(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = &query.error {
        let description = query.error_description.as_deref().unwrap_or(error);
        tracing::info!(error, "OAuth flow denied");
        return frontend_error_redirect(&state, description);
    }

    let code = match &query.code {
        Some(code) => code,
        None => return frontend_error_redirect(&state, "missing authorization code"),
    };

    if !state_matches(&headers, query.state.as_deref()) {
        return frontend_error_redirect(&state, "state mismatch");
    }

    match complete_login(&state, code).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "OAuth callback failed");
            frontend_error_redirect(&state, "login failed")
        }
    }
}

async fn complete_login(state: &SharedState, code: &str) -> Result<Response> {
    let token = state.oauth.exchange_authorization_code(code).await?;
    let orcid_id = match token.orcid.as_deref() {
        Some(id) if is_valid_orcid_id(id) => normalize_orcid_id(id),
        _ => {
            return Err(AppError::Authentication(
                "token response carried no valid ORCID iD".into(),
            ))
        }
    };
    let name = token.name.clone().unwrap_or_default();
    // ORCID does not release the real address without a members scope.
    let placeholder_email = format!("{}@orcid.placeholder", orcid_id);

    sqlx::query(
        "INSERT INTO users (username, orcid_id, display_name, email, orcid_access_token, orcid_refresh_token)
         VALUES ($1, $1, $2, $3, $4, $5)
         ON CONFLICT (orcid_id) DO UPDATE SET
            display_name = CASE WHEN EXCLUDED.display_name <> '' THEN EXCLUDED.display_name
                                ELSE users.display_name END,
            email = COALESCE(users.email, EXCLUDED.email),
            orcid_access_token = EXCLUDED.orcid_access_token,
            orcid_refresh_token = EXCLUDED.orcid_refresh_token,
            updated_at = NOW()",
    )
    .bind(&orcid_id)
    .bind(&name)
    .bind(&placeholder_email)
    .bind(&token.access_token)
    .bind(&token.refresh_token)
    .execute(&state.db)
    .await
    .map_err(|e| crate::error::AppError::Database(e.to_string()))?;

    // first sync runs in the background so login stays fast
    let sync = state.sync.clone();
    let sync_id = orcid_id.clone();
    tokio::spawn(async move {
        if let Err(e) = sync.sync(&sync_id, &SyncOptions::default()).await {
            tracing::warn!(orcid_id = sync_id, error = %e, "post-login sync failed");
        }
    });

    let session = mint_session(&state.config, &orcid_id, &name)?;
    let destination = format!(
        "{}/auth/success?{}",
        state.config.frontend_url,
        serde_urlencoded::to_string([("orcid_id", orcid_id.as_str())]).unwrap_or_default()
    );
    Ok((
        [(header::SET_COOKIE, session_cookie(&state.config, &session))],
        Redirect::temporary(&destination),
    )
        .into_response())
}

fn state_matches(headers: &HeaderMap, returned: Option<&str>) -> bool {
    let expected = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|pair| {
                let (key, value) = pair.trim().split_once('=')?;
                (key == STATE_COOKIE).then(|| value.to_string())
            })
        });
    match (expected, returned) {
        (Some(expected), Some(returned)) => expected == returned,
        _ => false,
    }
}

fn frontend_error_redirect(state: &SharedState, message: &str) -> Response {
    let query = serde_urlencoded::to_string([("error", message)]).unwrap_or_default();
    Redirect::temporary(&format!("{}/auth/error?{}", state.config.frontend_url, query))
        .into_response()
}

/// GET /oauth/status
async fn status(State(state): State<SharedState>) -> (StatusCode, Json<serde_json::Value>) {
    let configured =
        !state.config.orcid_client_id.is_empty() && !state.config.orcid_client_secret.is_empty();
    (
        StatusCode::OK,
        Json(json!({
            "configured": configured,
            "orcid_base_url": state.config.orcid_base_url,
            "redirect_uri": state.config.orcid_redirect_uri,
        })),
    )
}
