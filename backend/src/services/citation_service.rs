//! Citation aggregation pipeline.
//!
//! Works come from ORCID, citation counts from CrossRef. Lookups run with a
//! bounded fan-out and an overall deadline so one slow DOI cannot stall the
//! dashboard. Any pipeline failure degrades to a zero-filled year series so
//! the frontend chart always has something to render.

use chrono::Datelike;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::services::crossref_client::CrossrefClient;
use crate::services::orcid_client::{OrcidClient, WorkSummary};

const CONCURRENT_LOOKUPS: usize = 10;
const PER_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
const PIPELINE_DEADLINE: Duration = Duration::from_secs(45);

pub const DEFAULT_YEARS_BACK: u32 = 15;
pub const DEFAULT_MAX_PUBLICATIONS: usize = 20;

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Width of the trailing year window in the response series.
    pub years_back: u32,
    /// Cap on DOI lookups, most recent publications first.
    pub max_publications: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            years_back: DEFAULT_YEARS_BACK,
            max_publications: DEFAULT_MAX_PUBLICATIONS,
        }
    }
}

/// One work with a resolved citation count.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CitedWork {
    pub doi: String,
    pub title: String,
    pub publication_year: Option<i32>,
    pub citation_count: u64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct YearlyCitations {
    pub year: i32,
    pub citations: u64,
    pub cumulative_citations: u64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CitationTrend {
    /// Percentage change of the current year against the previous one.
    pub value: f64,
    pub is_positive: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CitationMetrics {
    pub total_citations: u64,
    pub total_publications: usize,
    pub cited_publications: usize,
    pub failed_lookups: usize,
    pub average_citations_per_year: f64,
    pub h_index_estimate: u64,
    pub trend: CitationTrend,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CitationAnalysis {
    pub orcid_id: String,
    pub yearly_citations: Vec<YearlyCitations>,
    pub metrics: CitationMetrics,
    /// Per-work resolved counts; the sync pipeline persists these.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub works: Vec<CitedWork>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CitationService {
    orcid: OrcidClient,
    crossref: CrossrefClient,
}

impl CitationService {
    pub fn new(orcid: OrcidClient, crossref: CrossrefClient) -> Self {
        Self { orcid, crossref }
    }

    /// Run the full pipeline. Never fails: upstream errors produce a
    /// zero-filled series with the error message attached.
    pub async fn analyze(&self, orcid_id: &str, options: &AnalysisOptions) -> CitationAnalysis {
        let current_year = chrono::Utc::now().year();
        match self.run(orcid_id, options, current_year).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(orcid_id, error = %e, "citation analysis failed");
                zero_filled_analysis(orcid_id, options.years_back, current_year, Some(e.to_string()))
            }
        }
    }

    async fn run(
        &self,
        orcid_id: &str,
        options: &AnalysisOptions,
        current_year: i32,
    ) -> Result<CitationAnalysis> {
        let works = self.orcid.work_summaries(orcid_id).await?;
        let candidates = select_candidates(&works, options.max_publications);
        let total_publications = works.len();

        let (cited, failed_lookups) = tokio::time::timeout(
            PIPELINE_DEADLINE,
            self.lookup_citations(candidates),
        )
        .await
        .map_err(|_| AppError::Upstream("citation lookups exceeded deadline".into()))?;

        Ok(build_analysis(
            orcid_id,
            &cited,
            total_publications,
            failed_lookups,
            options.years_back,
            current_year,
        ))
    }

    async fn lookup_citations(&self, candidates: Vec<WorkSummary>) -> (Vec<CitedWork>, usize) {
        let mut cited = Vec::new();
        let mut failed = 0usize;

        let mut lookups = stream::iter(candidates.into_iter().filter_map(|work| {
            work.doi.clone().map(|doi| {
                let crossref = self.crossref.clone();
                async move {
                    let info = crossref.citation_info(&doi, PER_LOOKUP_TIMEOUT).await;
                    (work, info)
                }
            })
        }))
        .buffer_unordered(CONCURRENT_LOOKUPS);

        while let Some((work, info)) = lookups.next().await {
            match info {
                Ok(info) => cited.push(CitedWork {
                    doi: info.doi,
                    title: work.title,
                    publication_year: work.publication_year,
                    citation_count: info.citation_count as u64,
                }),
                Err(e) => {
                    tracing::debug!(doi = ?work.doi, error = %e, "citation lookup failed");
                    failed += 1;
                }
            }
        }

        (cited, failed)
    }
}

// ---------------------------------------------------------------------------
// Aggregation (pure)
// ---------------------------------------------------------------------------

/// Keep works that carry a DOI, most recent first, capped.
pub fn select_candidates(works: &[WorkSummary], max_publications: usize) -> Vec<WorkSummary> {
    let mut with_doi: Vec<WorkSummary> =
        works.iter().filter(|w| w.doi.is_some()).cloned().collect();
    with_doi.sort_by(|a, b| b.publication_year.cmp(&a.publication_year));
    with_doi.truncate(max_publications);
    with_doi
}

pub fn bucket_by_year(cited: &[CitedWork]) -> BTreeMap<i32, u64> {
    let mut buckets = BTreeMap::new();
    for work in cited {
        if let Some(year) = work.publication_year {
            *buckets.entry(year).or_insert(0) += work.citation_count;
        }
    }
    buckets
}

/// Trailing window of `years_back` years ending at `current_year`. The
/// cumulative series starts from citations accrued before the window, so
/// the final cumulative value matches the all-time dated total.
pub fn build_yearly_series(
    buckets: &BTreeMap<i32, u64>,
    years_back: u32,
    current_year: i32,
) -> Vec<YearlyCitations> {
    let window_start = current_year - years_back as i32 + 1;
    let mut cumulative: u64 = buckets
        .iter()
        .filter(|(year, _)| **year < window_start)
        .map(|(_, count)| count)
        .sum();

    (window_start..=current_year)
        .map(|year| {
            let citations = buckets.get(&year).copied().unwrap_or(0);
            cumulative += citations;
            YearlyCitations {
                year,
                citations,
                cumulative_citations: cumulative,
            }
        })
        .collect()
}

/// `min(cited_pubs, total/cited_pubs)` is a cheap upper bound on the real
/// h-index that is close enough for a dashboard widget.
pub fn h_index_estimate(cited_publications: usize, total_citations: u64) -> u64 {
    if cited_publications == 0 {
        return 0;
    }
    (cited_publications as u64).min(total_citations / cited_publications as u64)
}

/// Average citations per year, over years that saw any citations.
pub fn average_citations_per_year(buckets: &BTreeMap<i32, u64>) -> f64 {
    let nonzero_years = buckets.values().filter(|c| **c > 0).count();
    if nonzero_years == 0 {
        return 0.0;
    }
    let dated: u64 = buckets.values().sum();
    (dated as f64 / nonzero_years as f64 * 10.0).round() / 10.0
}

pub fn compute_trend(buckets: &BTreeMap<i32, u64>, current_year: i32) -> CitationTrend {
    let current = buckets.get(&current_year).copied().unwrap_or(0);
    let previous = buckets.get(&(current_year - 1)).copied().unwrap_or(0);

    let value = if previous == 0 {
        if current > 0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current as f64 - previous as f64) / previous as f64 * 100.0
    };

    CitationTrend {
        value: (value * 10.0).round() / 10.0,
        is_positive: current >= previous,
    }
}

pub fn build_analysis(
    orcid_id: &str,
    cited: &[CitedWork],
    total_publications: usize,
    failed_lookups: usize,
    years_back: u32,
    current_year: i32,
) -> CitationAnalysis {
    let buckets = bucket_by_year(cited);
    let total_citations: u64 = cited.iter().map(|w| w.citation_count).sum();
    let cited_publications = cited.iter().filter(|w| w.citation_count > 0).count();

    CitationAnalysis {
        orcid_id: orcid_id.to_string(),
        yearly_citations: build_yearly_series(&buckets, years_back, current_year),
        metrics: CitationMetrics {
            total_citations,
            total_publications,
            cited_publications,
            failed_lookups,
            average_citations_per_year: average_citations_per_year(&buckets),
            h_index_estimate: h_index_estimate(cited_publications, total_citations),
            trend: compute_trend(&buckets, current_year),
        },
        works: cited.to_vec(),
        error: None,
    }
}

pub fn zero_filled_analysis(
    orcid_id: &str,
    years_back: u32,
    current_year: i32,
    error: Option<String>,
) -> CitationAnalysis {
    let mut analysis = build_analysis(orcid_id, &[], 0, 0, years_back, current_year);
    analysis.error = error;
    analysis
}
