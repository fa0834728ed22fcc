//! CrossRef REST API client for DOI-based publication lookup.
//!
//! Responses arrive wrapped in a `{"status": ..., "message": ...}` envelope;
//! the client unwraps it. A contact User-Agent is sent on every request per
//! CrossRef polite-pool etiquette.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{AppError, Result};

/// CrossRef caps search page size at 1000 rows and offsets at 10000.
const MAX_SEARCH_ROWS: u32 = 1000;
const MAX_SEARCH_OFFSET: u32 = 10_000;

static DOI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^10\.\d{4,}/\S+$").unwrap());

/// Strip the `doi:` prefix if present.
pub fn normalize_doi(doi: &str) -> String {
    doi.trim().strip_prefix("doi:").unwrap_or(doi.trim()).to_string()
}

/// Validate the `10.XXXX/suffix` format (`doi:` prefix allowed).
pub fn is_valid_doi(doi: &str) -> bool {
    DOI_RE.is_match(&normalize_doi(doi))
}

/// Citation counters for one work.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CitationInfo {
    pub doi: String,
    pub title: String,
    pub citation_count: u32,
    pub reference_count: u32,
}

/// Publication metadata flattened from a CrossRef work message.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PublicationMetadata {
    pub doi: Option<String>,
    pub title: String,
    pub authors: Vec<PublicationAuthor>,
    pub journal: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub published_month: Option<u32>,
    pub published_day: Option<u32>,
    pub work_type: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub page: Option<String>,
    pub url: Option<String>,
    pub citation_count: u32,
    pub reference_count: u32,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PublicationAuthor {
    pub given_name: String,
    pub family_name: String,
    pub full_name: String,
    pub orcid: Option<String>,
    pub affiliations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CrossrefClient {
    http: reqwest::Client,
    base_url: String,
}

impl CrossrefClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        Self::with_base_url("https://api.crossref.org", user_agent)
    }

    pub fn with_base_url(base_url: impl Into<String>, user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(AppError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)], timeout: Duration) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(query)
            .timeout(timeout)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("DOI not found: {}", path)));
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "CrossRef returned {} for {}",
                status, path
            )));
        }

        let body: Value = resp.json().await?;
        Ok(body["message"].clone())
    }

    /// Fetch the raw work message for a DOI.
    pub async fn work(&self, doi: &str, timeout: Duration) -> Result<Value> {
        let clean = normalize_doi(doi);
        if !DOI_RE.is_match(&clean) {
            return Err(AppError::Validation(format!("Invalid DOI: {}", doi)));
        }
        self.get(&format!("/works/{}", clean), &[], timeout).await
    }

    /// Citation counters only (one GET, cheap parse).
    pub async fn citation_info(&self, doi: &str, timeout: Duration) -> Result<CitationInfo> {
        let work = self.work(doi, timeout).await?;
        Ok(parse_citation_info(&work))
    }

    /// Flattened publication metadata for display.
    pub async fn publication(&self, doi: &str, timeout: Duration) -> Result<PublicationMetadata> {
        let work = self.work(doi, timeout).await?;
        Ok(parse_publication(&work))
    }

    /// Free-text search over `/works`.
    pub async fn search(&self, query: &str, rows: u32, offset: u32) -> Result<Value> {
        self.get(
            "/works",
            &[
                ("query", query.to_string()),
                ("rows", rows.min(MAX_SEARCH_ROWS).to_string()),
                ("offset", offset.min(MAX_SEARCH_OFFSET).to_string()),
            ],
            Duration::from_secs(10),
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Message parsing
// ---------------------------------------------------------------------------

pub fn parse_citation_info(work: &Value) -> CitationInfo {
    CitationInfo {
        doi: work["DOI"].as_str().unwrap_or("").to_string(),
        title: first_title(work),
        citation_count: work["is-referenced-by-count"].as_u64().unwrap_or(0) as u32,
        reference_count: work["references-count"].as_u64().unwrap_or(0) as u32,
    }
}

pub fn parse_publication(work: &Value) -> PublicationMetadata {
    let (year, month, day) = parse_date_parts(&work["published"]);

    PublicationMetadata {
        doi: work["DOI"].as_str().map(String::from),
        title: first_title(work),
        authors: parse_authors(work),
        journal: work["container-title"]
            .as_array()
            .and_then(|titles| titles.first())
            .and_then(|t| t.as_str())
            .map(String::from),
        publisher: work["publisher"].as_str().map(String::from),
        published_year: year,
        published_month: month,
        published_day: day,
        work_type: work["type"].as_str().map(String::from),
        volume: work["volume"].as_str().map(String::from),
        issue: work["issue"].as_str().map(String::from),
        page: work["page"].as_str().map(String::from),
        url: work["URL"].as_str().map(String::from),
        citation_count: work["is-referenced-by-count"].as_u64().unwrap_or(0) as u32,
        reference_count: work["references-count"].as_u64().unwrap_or(0) as u32,
    }
}

fn first_title(work: &Value) -> String {
    work["title"]
        .as_array()
        .and_then(|titles| titles.first())
        .and_then(|t| t.as_str())
        .unwrap_or("Unknown Title")
        .to_string()
}

fn parse_authors(work: &Value) -> Vec<PublicationAuthor> {
    work["author"]
        .as_array()
        .unwrap_or(&Vec::new())
        .iter()
        .map(|author| {
            let given = author["given"].as_str().unwrap_or("").trim().to_string();
            let family = author["family"].as_str().unwrap_or("").trim().to_string();
            let full_name = format!("{} {}", given, family).trim().to_string();
            PublicationAuthor {
                given_name: given,
                family_name: family,
                full_name,
                orcid: author["ORCID"].as_str().map(String::from),
                affiliations: author["affiliation"]
                    .as_array()
                    .map(|affs| {
                        affs.iter()
                            .filter_map(|a| a["name"].as_str())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            }
        })
        .collect()
}

/// Parse CrossRef `date-parts`: `[[year, month, day]]` with month/day
/// optional.
pub fn parse_date_parts(date: &Value) -> (Option<i32>, Option<u32>, Option<u32>) {
    let parts = match date["date-parts"]
        .as_array()
        .and_then(|dp| dp.first())
        .and_then(|p| p.as_array())
    {
        Some(parts) => parts,
        None => return (None, None, None),
    };

    let year = parts.first().and_then(|y| y.as_i64()).map(|y| y as i32);
    let month = parts.get(1).and_then(|m| m.as_u64()).map(|m| m as u32);
    let day = parts.get(2).and_then(|d| d.as_u64()).map(|d| d as u32);
    (year, month, day)
}
