//! User-declared social media accounts.
//!
//! Accounts live in the `social_accounts` JSONB column on the user row.
//! Writing replaces any existing entry for the same platform.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::types::Json as SqlJson;

use crate::api::middleware::auth::CurrentSession;
use crate::api::validation::{require_orcid_id, validate_profile_link};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::user::SocialAccount;

pub fn router() -> Router<SharedState> {
    Router::new().route("/social-media", get(list_social_accounts).post(add_social_account))
}

#[derive(Debug, Deserialize)]
pub struct SocialQuery {
    pub orcid_id: Option<String>,
}

/// GET /api/social-media
///
/// Accounts for the given ORCID iD, or for the logged-in user when no iD is
/// passed.
pub async fn list_social_accounts(
    State(state): State<SharedState>,
    session: Option<CurrentSession>,
    Query(query): Query<SocialQuery>,
) -> Result<Json<Vec<SocialAccount>>> {
    let orcid_id = match (&query.orcid_id, &session) {
        (Some(raw), _) => require_orcid_id(raw)?,
        (None, Some(CurrentSession(claims))) => claims.sub.clone(),
        (None, None) => {
            return Err(AppError::Validation(
                "orcid_id is required when not logged in".into(),
            ))
        }
    };

    let row: Option<(SqlJson<Vec<SocialAccount>>,)> =
        sqlx::query_as("SELECT social_accounts FROM users WHERE orcid_id = $1")
            .bind(&orcid_id)
            .fetch_optional(&state.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

    match row {
        Some((SqlJson(accounts),)) => Ok(Json(accounts)),
        None => Err(AppError::NotFound(format!("No user with iD {}", orcid_id))),
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AddSocialAccount {
    pub platform: String,
    pub username: String,
    pub url: String,
}

/// POST /api/social-media
pub async fn add_social_account(
    State(state): State<SharedState>,
    CurrentSession(session): CurrentSession,
    Json(body): Json<AddSocialAccount>,
) -> Result<Json<Vec<SocialAccount>>> {
    let platform = body.platform.trim().to_lowercase();
    if platform.is_empty() {
        return Err(AppError::Validation("platform is required".into()));
    }
    if body.username.trim().is_empty() {
        return Err(AppError::Validation("username is required".into()));
    }
    validate_profile_link(&body.url, "Profile URL")?;

    let row: Option<(SqlJson<Vec<SocialAccount>>,)> =
        sqlx::query_as("SELECT social_accounts FROM users WHERE orcid_id = $1")
            .bind(&session.sub)
            .fetch_optional(&state.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

    let mut accounts = match row {
        Some((SqlJson(accounts),)) => accounts,
        None => return Err(AppError::NotFound("User not found".into())),
    };

    accounts.retain(|account| account.platform != platform);
    accounts.push(SocialAccount {
        platform,
        username: body.username.trim().to_string(),
        url: body.url.trim().to_string(),
    });

    sqlx::query("UPDATE users SET social_accounts = $2, updated_at = NOW() WHERE orcid_id = $1")
        .bind(&session.sub)
        .bind(SqlJson(&accounts))
        .execute(&state.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(accounts))
}
