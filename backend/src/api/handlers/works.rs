//! Publication listings.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use std::time::Duration;

use crate::api::validation::{require_doi, require_orcid_id};
use crate::api::SharedState;
use crate::error::Result;
use crate::services::crossref_client::PublicationMetadata;
use crate::services::orcid_client::WorkSummary;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/researcher-papers", get(get_researcher_papers))
        .route("/publication-details", get(get_publication_details))
}

#[derive(Debug, Deserialize)]
pub struct PapersQuery {
    pub orcid_id: String,
    pub limit: Option<usize>,
}

/// GET /api/researcher-papers
///
/// Flattened work summaries straight from the ORCID record, most recent
/// first.
pub async fn get_researcher_papers(
    State(state): State<SharedState>,
    Query(query): Query<PapersQuery>,
) -> Result<Json<Vec<WorkSummary>>> {
    let orcid_id = require_orcid_id(&query.orcid_id)?;
    let mut papers = state.orcid.work_summaries(&orcid_id).await?;
    papers.sort_by(|a, b| b.publication_year.cmp(&a.publication_year));
    if let Some(limit) = query.limit {
        papers.truncate(limit.clamp(1, 500));
    }
    Ok(Json(papers))
}

#[derive(Debug, Deserialize)]
pub struct PublicationQuery {
    pub doi: String,
}

/// GET /api/publication-details
///
/// Full CrossRef metadata for one DOI: authors, venue, dates, citation
/// counters.
pub async fn get_publication_details(
    State(state): State<SharedState>,
    Query(query): Query<PublicationQuery>,
) -> Result<Json<PublicationMetadata>> {
    let doi = require_doi(&query.doi)?;
    let publication = state.crossref.publication(&doi, Duration::from_secs(10)).await?;
    Ok(Json(publication))
}
