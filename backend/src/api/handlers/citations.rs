//! Citation metrics and analysis endpoints.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::validation::require_orcid_id;
use crate::api::SharedState;
use crate::error::Result;
use crate::services::citation_service::{
    AnalysisOptions, CitationAnalysis, DEFAULT_MAX_PUBLICATIONS, DEFAULT_YEARS_BACK,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/citation-metrics", get(get_citation_metrics))
        .route("/citation-analysis", get(get_citation_analysis))
}

#[derive(Debug, Deserialize)]
pub struct CitationQuery {
    pub orcid_id: String,
    pub years_back: Option<u32>,
    pub max_publications: Option<usize>,
}

impl CitationQuery {
    fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            years_back: self.years_back.unwrap_or(DEFAULT_YEARS_BACK).clamp(1, 50),
            max_publications: self
                .max_publications
                .unwrap_or(DEFAULT_MAX_PUBLICATIONS)
                .clamp(1, 200),
        }
    }
}

/// GET /api/citation-metrics
///
/// Dashboard metrics, served from stored sync results when available. Falls
/// back to a live ORCID + CrossRef analysis for researchers that have never
/// been synced (or when the database is unreachable).
pub async fn get_citation_metrics(
    State(state): State<SharedState>,
    Query(query): Query<CitationQuery>,
) -> Result<Json<CitationAnalysis>> {
    let orcid_id = require_orcid_id(&query.orcid_id)?;
    let options = query.options();

    match state.metrics.stored_analysis(&orcid_id, options.years_back).await {
        Ok(Some(analysis)) => return Ok(Json(analysis)),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(orcid_id, error = %e, "stored metrics unavailable, using live analysis");
        }
    }

    Ok(Json(state.citations.analyze(&orcid_id, &options).await))
}

/// GET /api/citation-analysis
///
/// Always runs the live pipeline. Slow; intended for explicit refreshes.
pub async fn get_citation_analysis(
    State(state): State<SharedState>,
    Query(query): Query<CitationQuery>,
) -> Result<Json<CitationAnalysis>> {
    let orcid_id = require_orcid_id(&query.orcid_id)?;
    let options = query.options();
    Ok(Json(state.citations.analyze(&orcid_id, &options).await))
}
