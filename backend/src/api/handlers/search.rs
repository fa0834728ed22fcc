//! ORCID registry search.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::validation::clamp_rows;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::orcid_client::{affiliation_query, doi_query, name_query};

pub fn router() -> Router<SharedState> {
    Router::new().route("/search-researchers", get(search_researchers))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Raw Solr query; overrides the structured fields below when present.
    pub q: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub affiliation: Option<String>,
    pub doi: Option<String>,
    pub rows: Option<u32>,
    pub start: Option<u32>,
}

impl SearchQuery {
    fn build(&self) -> Result<String> {
        if let Some(q) = &self.q {
            if !q.trim().is_empty() {
                return Ok(q.trim().to_string());
            }
        }
        if let Some(doi) = &self.doi {
            return Ok(doi_query(doi));
        }
        if let Some(affiliation) = &self.affiliation {
            return affiliation_query(affiliation);
        }
        if self.given_name.is_some() || self.family_name.is_some() {
            return name_query(self.given_name.as_deref(), self.family_name.as_deref());
        }
        Err(AppError::Validation(
            "Provide q, a name, a DOI, or an affiliation to search".into(),
        ))
    }
}

/// GET /api/search-researchers
///
/// Passes the registry's expanded-search response through unchanged so the
/// frontend sees ORCID's native result shape.
pub async fn search_researchers(
    State(state): State<SharedState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>> {
    let solr_query = query.build()?;
    let rows = clamp_rows(query.rows, 20, 100);
    let start = query.start.unwrap_or(0);
    let results = state.orcid.search(&solr_query, rows, start).await?;
    Ok(Json(results))
}
