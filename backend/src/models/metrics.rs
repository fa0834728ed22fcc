//! Cached research metrics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Aggregate metrics for a user, recomputed after each profile sync.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserMetrics {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_publications: i32,
    pub total_citations: i32,
    pub h_index: i32,
    pub i10_index: i32,
    pub years_active: i32,
    pub first_publication_year: Option<i32>,
    pub last_publication_year: Option<i32>,
    pub avg_citations_per_paper: f64,
    pub max_citations_single_paper: i32,
    pub last_calculated: DateTime<Utc>,
}

/// One year of the per-user citation time series.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CitationYearRow {
    pub year: i32,
    pub citations_count: i32,
}
