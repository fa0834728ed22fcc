//! Researcher identity lookup.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::auth::CurrentSession;
use crate::api::validation::require_orcid_id;
use crate::api::SharedState;
use crate::error::Result;
use crate::services::orcid_client::UserIdentity;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/user-identity", get(get_user_identity))
        .route("/current-user-identity", get(get_current_user_identity))
}

#[derive(Debug, Deserialize)]
pub struct IdentityQuery {
    pub orcid_id: String,
}

/// GET /api/user-identity
///
/// Public identity summary for any ORCID iD, assembled from the
/// personal-details, emails and employments sections.
pub async fn get_user_identity(
    State(state): State<SharedState>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<UserIdentity>> {
    let orcid_id = require_orcid_id(&query.orcid_id)?;
    let identity = state.orcid.identity(&orcid_id).await?;
    Ok(Json(identity))
}

/// GET /api/current-user-identity
pub async fn get_current_user_identity(
    State(state): State<SharedState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<UserIdentity>> {
    let identity = state.orcid.identity(&session.sub).await?;
    Ok(Json(identity))
}
