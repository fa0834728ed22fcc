//! Stored researcher profiles.
//!
//! Serves what the sync pipeline has persisted, honoring the per-user
//! privacy flags: a private profile reads as absent, and hidden sections
//! come back empty rather than erroring.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::validation::require_orcid_id;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::affiliation::Affiliation;
use crate::models::funding::Funding;
use crate::models::institution::Institution;
use crate::models::metrics::UserMetrics;
use crate::models::user::User;

pub fn router() -> Router<SharedState> {
    Router::new().route("/researcher-profile", get(get_researcher_profile))
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub orcid_id: String,
}

#[derive(Debug, Serialize)]
pub struct ResearcherProfile {
    pub user: User,
    pub affiliations: Vec<Affiliation>,
    pub institutions: Vec<Institution>,
    pub funding: Vec<Funding>,
    pub metrics: Option<UserMetrics>,
}

/// GET /api/researcher-profile
pub async fn get_researcher_profile(
    State(state): State<SharedState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<ResearcherProfile>> {
    let orcid_id = require_orcid_id(&query.orcid_id)?;

    let user: User = sqlx::query_as("SELECT * FROM users WHERE orcid_id = $1")
        .bind(&orcid_id)
        .fetch_optional(&state.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .filter(|u: &User| u.profile_public)
        .ok_or_else(|| AppError::NotFound(format!("No profile for iD {}", orcid_id)))?;

    let (affiliations, institutions, funding) = if user.show_affiliations {
        let affiliations: Vec<Affiliation> = sqlx::query_as(
            "SELECT * FROM affiliations WHERE user_id = $1
             ORDER BY is_current DESC, start_date DESC NULLS LAST",
        )
        .bind(user.id)
        .fetch_all(&state.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let institutions: Vec<Institution> = sqlx::query_as(
            "SELECT DISTINCT i.* FROM institutions i
             JOIN affiliations a ON a.institution_id = i.id
             WHERE a.user_id = $1",
        )
        .bind(user.id)
        .fetch_all(&state.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let funding: Vec<Funding> = sqlx::query_as(
            "SELECT * FROM funding WHERE user_id = $1 ORDER BY start_date DESC NULLS LAST",
        )
        .bind(user.id)
        .fetch_all(&state.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        (affiliations, institutions, funding)
    } else {
        (Vec::new(), Vec::new(), Vec::new())
    };

    let metrics = if user.show_metrics {
        state.metrics.metrics_for_user(user.id).await?
    } else {
        None
    };

    Ok(Json(ResearcherProfile {
        user,
        affiliations,
        institutions,
        funding,
        metrics,
    }))
}
