//! Stored research metrics.
//!
//! The sync pipeline caches per-work citation counts and a per-year time
//! series in PostgreSQL; this service recomputes the aggregate row and
//! serves the dashboard from storage so the common path never touches an
//! upstream API.

use chrono::Datelike;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::metrics::{CitationYearRow, UserMetrics};
use crate::services::citation_service::{
    average_citations_per_year, build_yearly_series, compute_trend, CitationAnalysis,
    CitationMetrics, YearlyCitations,
};

/// Proper h-index over per-work citation counts.
pub fn h_index(citation_counts: &[i32]) -> i32 {
    let mut sorted: Vec<i32> = citation_counts.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted
        .iter()
        .enumerate()
        .take_while(|(rank, count)| **count >= (*rank as i32 + 1))
        .count() as i32
}

/// Number of works with at least ten citations.
pub fn i10_index(citation_counts: &[i32]) -> i32 {
    citation_counts.iter().filter(|c| **c >= 10).count() as i32
}

#[derive(Debug, Clone)]
pub struct MetricsService {
    db: PgPool,
}

impl MetricsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn metrics_for_user(&self, user_id: Uuid) -> Result<Option<UserMetrics>> {
        sqlx::query_as::<_, UserMetrics>("SELECT * FROM user_metrics WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn citation_series(&self, user_id: Uuid) -> Result<Vec<CitationYearRow>> {
        sqlx::query_as::<_, CitationYearRow>(
            "SELECT year, citations_count FROM citation_timeseries
             WHERE user_id = $1 ORDER BY year",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Assemble a dashboard payload from stored metrics. Returns `None` when
    /// the researcher has never been synced, so the caller can fall back to
    /// a live analysis.
    pub async fn stored_analysis(
        &self,
        orcid_id: &str,
        years_back: u32,
    ) -> Result<Option<CitationAnalysis>> {
        let user_id: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE orcid_id = $1")
                .bind(orcid_id)
                .fetch_optional(&self.db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        let user_id = match user_id {
            Some((id,)) => id,
            None => return Ok(None),
        };

        let metrics = match self.metrics_for_user(user_id).await? {
            Some(metrics) => metrics,
            None => return Ok(None),
        };

        let series = self.citation_series(user_id).await?;
        let current_year = chrono::Utc::now().year();
        Ok(Some(assemble_analysis(
            orcid_id,
            &metrics,
            &series,
            years_back,
            current_year,
        )))
    }

    /// Recompute the aggregate metrics row from stored works. Called after
    /// every profile sync.
    pub async fn recompute(&self, user_id: Uuid) -> Result<UserMetrics> {
        let rows: Vec<(i32, Option<i32>)> = sqlx::query_as(
            "SELECT w.citation_count, w.publication_year
             FROM works w
             JOIN work_authors wa ON wa.work_id = w.id
             WHERE wa.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let counts: Vec<i32> = rows.iter().map(|(count, _)| *count).collect();
        let years: Vec<i32> = rows.iter().filter_map(|(_, year)| *year).collect();

        // Some works never resolve to a DOI, so their counts stay at zero;
        // the time series still carries those citations.
        let (series_total,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(citations_count), 0) FROM citation_timeseries
             WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let total_publications = counts.len() as i32;
        let total_citations: i64 = counts.iter().map(|c| *c as i64).sum::<i64>().max(series_total);
        let first_year = years.iter().min().copied();
        let last_year = years.iter().max().copied();
        let years_active = match (first_year, last_year) {
            (Some(first), Some(last)) => last - first + 1,
            _ => 0,
        };
        let avg = if total_publications > 0 {
            total_citations as f64 / total_publications as f64
        } else {
            0.0
        };

        sqlx::query_as::<_, UserMetrics>(
            "INSERT INTO user_metrics (
                user_id, total_publications, total_citations, h_index, i10_index,
                years_active, first_publication_year, last_publication_year,
                avg_citations_per_paper, max_citations_single_paper, last_calculated
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
             ON CONFLICT (user_id) DO UPDATE SET
                total_publications = EXCLUDED.total_publications,
                total_citations = EXCLUDED.total_citations,
                h_index = EXCLUDED.h_index,
                i10_index = EXCLUDED.i10_index,
                years_active = EXCLUDED.years_active,
                first_publication_year = EXCLUDED.first_publication_year,
                last_publication_year = EXCLUDED.last_publication_year,
                avg_citations_per_paper = EXCLUDED.avg_citations_per_paper,
                max_citations_single_paper = EXCLUDED.max_citations_single_paper,
                last_calculated = NOW()
             RETURNING *",
        )
        .bind(user_id)
        .bind(total_publications)
        .bind(total_citations as i32)
        .bind(h_index(&counts))
        .bind(i10_index(&counts))
        .bind(years_active)
        .bind(first_year)
        .bind(last_year)
        .bind(avg)
        .bind(counts.iter().max().copied().unwrap_or(0))
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace the stored citation time series for a user.
    pub async fn store_citation_series(
        &self,
        user_id: Uuid,
        series: &[YearlyCitations],
    ) -> Result<()> {
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query("DELETE FROM citation_timeseries WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for year in series {
            sqlx::query(
                "INSERT INTO citation_timeseries (user_id, year, citations_count)
                 VALUES ($1, $2, $3)",
            )
            .bind(user_id)
            .bind(year.year)
            .bind(year.citations as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Shape stored rows into the same payload the live pipeline produces.
pub fn assemble_analysis(
    orcid_id: &str,
    metrics: &UserMetrics,
    series: &[CitationYearRow],
    years_back: u32,
    current_year: i32,
) -> CitationAnalysis {
    let buckets: std::collections::BTreeMap<i32, u64> = series
        .iter()
        .map(|row| (row.year, row.citations_count.max(0) as u64))
        .collect();

    // The series is the ground truth for totals; the aggregate row may lag
    // behind when older syncs never wrote per-work counts.
    let series_total: u64 = buckets.values().sum();

    CitationAnalysis {
        orcid_id: orcid_id.to_string(),
        yearly_citations: build_yearly_series(&buckets, years_back, current_year),
        metrics: CitationMetrics {
            total_citations: series_total.max(metrics.total_citations.max(0) as u64),
            total_publications: metrics.total_publications.max(0) as usize,
            cited_publications: 0,
            failed_lookups: 0,
            average_citations_per_year: average_citations_per_year(&buckets),
            h_index_estimate: metrics.h_index.max(0) as u64,
            trend: compute_trend(&buckets, current_year),
        },
        works: Vec::new(),
        error: None,
    }
}
