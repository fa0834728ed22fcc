//! ORCID public API v3.0 client.
//!
//! Wraps the record sections used by the platform (person, works,
//! employments, educations, fundings) plus registry search. All calls work
//! without a token against the public API; a bearer token obtained through
//! the OAuth flow is attached when present.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{AppError, Result};

/// ORCID caps search page size at 1000 rows.
const MAX_SEARCH_ROWS: u32 = 1000;

static ORCID_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{4}-\d{4}-\d{3}[\dX]$").unwrap());

/// Strip the registry URI prefix, leaving the bare 16-character iD.
pub fn normalize_orcid_id(orcid_id: &str) -> String {
    orcid_id
        .trim()
        .trim_start_matches("https://orcid.org/")
        .trim_start_matches("http://orcid.org/")
        .to_string()
}

/// Validate the `0000-0000-0000-000X` format (URI prefix allowed).
pub fn is_valid_orcid_id(orcid_id: &str) -> bool {
    ORCID_ID_RE.is_match(&normalize_orcid_id(orcid_id))
}

/// Condensed identity extracted from several ORCID record sections.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UserIdentity {
    pub orcid_id: String,
    pub name: String,
    pub email: Option<String>,
    pub current_affiliation: Option<String>,
    pub current_location: Option<String>,
    pub profile_url: String,
}

/// One work from the `/works` section, flattened for display and citation
/// lookup.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct WorkSummary {
    pub title: String,
    pub work_type: String,
    pub doi: Option<String>,
    pub publication_year: Option<i32>,
    pub journal: Option<String>,
    pub url: Option<String>,
    pub put_code: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct OrcidClient {
    http: reqwest::Client,
    api_base: String,
    access_token: Option<String>,
}

impl OrcidClient {
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(AppError::Http)?;
        Ok(Self {
            http,
            api_base: api_base.into(),
            access_token: None,
        })
    }

    /// Attach a bearer token for member-scoped reads.
    pub fn with_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.api_base, path);
        let mut req = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(query);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "ORCID record section {} not found",
                path
            )));
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "ORCID returned {} for {}",
                status, path
            )));
        }
        Ok(resp.json().await?)
    }

    async fn record_section(&self, orcid_id: &str, section: &str) -> Result<Value> {
        let id = normalize_orcid_id(orcid_id);
        if !ORCID_ID_RE.is_match(&id) {
            return Err(AppError::Validation(format!("Invalid ORCID iD: {}", orcid_id)));
        }
        self.get(&format!("/{}/{}", id, section), &[]).await
    }

    pub async fn record(&self, orcid_id: &str) -> Result<Value> {
        let id = normalize_orcid_id(orcid_id);
        if !ORCID_ID_RE.is_match(&id) {
            return Err(AppError::Validation(format!("Invalid ORCID iD: {}", orcid_id)));
        }
        self.get(&format!("/{}", id), &[]).await
    }

    pub async fn person(&self, orcid_id: &str) -> Result<Value> {
        self.record_section(orcid_id, "person").await
    }

    pub async fn personal_details(&self, orcid_id: &str) -> Result<Value> {
        self.record_section(orcid_id, "personal-details").await
    }

    pub async fn emails(&self, orcid_id: &str) -> Result<Value> {
        self.record_section(orcid_id, "emails").await
    }

    pub async fn works(&self, orcid_id: &str) -> Result<Value> {
        self.record_section(orcid_id, "works").await
    }

    pub async fn employments(&self, orcid_id: &str) -> Result<Value> {
        self.record_section(orcid_id, "employments").await
    }

    pub async fn educations(&self, orcid_id: &str) -> Result<Value> {
        self.record_section(orcid_id, "educations").await
    }

    pub async fn fundings(&self, orcid_id: &str) -> Result<Value> {
        self.record_section(orcid_id, "fundings").await
    }

    /// Registry search with Solr/Lucene query syntax.
    pub async fn search(&self, query: &str, rows: u32, start: u32) -> Result<Value> {
        self.get(
            "/search/",
            &[
                ("q", query.to_string()),
                ("rows", rows.min(MAX_SEARCH_ROWS).to_string()),
                ("start", start.to_string()),
            ],
        )
        .await
    }

    /// Flattened identity summary. Email, affiliation, and location lookups
    /// degrade to `None` if their sections fail; only the name lookup is
    /// required.
    pub async fn identity(&self, orcid_id: &str) -> Result<UserIdentity> {
        let id = normalize_orcid_id(orcid_id);
        let details = self.personal_details(&id).await?;
        let name = extract_full_name(&details);

        let email = match self.emails(&id).await {
            Ok(emails) => extract_primary_email(&emails),
            Err(e) => {
                tracing::debug!(orcid_id = %id, error = %e, "Email lookup failed, continuing");
                None
            }
        };

        let (current_affiliation, current_location) = match self.employments(&id).await {
            Ok(employments) => extract_current_employment(&employments),
            Err(e) => {
                tracing::debug!(orcid_id = %id, error = %e, "Employment lookup failed, continuing");
                (None, None)
            }
        };

        Ok(UserIdentity {
            profile_url: format!("https://orcid.org/{}", id),
            orcid_id: id,
            name,
            email,
            current_affiliation,
            current_location,
        })
    }

    /// All works for an iD, flattened to one entry per work summary.
    pub async fn work_summaries(&self, orcid_id: &str) -> Result<Vec<WorkSummary>> {
        let works = self.works(orcid_id).await?;
        Ok(extract_work_summaries(&works))
    }
}

// ---------------------------------------------------------------------------
// Search query builders (Solr field syntax)
// ---------------------------------------------------------------------------

/// Build a name search query. At least one of the names must be given.
pub fn name_query(given_name: Option<&str>, family_name: Option<&str>) -> Result<String> {
    let mut parts = Vec::new();
    if let Some(given) = given_name.filter(|s| !s.trim().is_empty()) {
        parts.push(format!("given-names:\"{}\"", escape_query(given)));
    }
    if let Some(family) = family_name.filter(|s| !s.trim().is_empty()) {
        parts.push(format!("family-name:\"{}\"", escape_query(family)));
    }
    if parts.is_empty() {
        return Err(AppError::Validation(
            "At least one name parameter must be provided".into(),
        ));
    }
    Ok(parts.join(" AND "))
}

/// Build an affiliation organization search query.
pub fn affiliation_query(organization: &str) -> Result<String> {
    if organization.trim().is_empty() {
        return Err(AppError::Validation("Organization must not be empty".into()));
    }
    Ok(format!(
        "affiliation-org-name:\"{}\"",
        escape_query(organization)
    ))
}

/// Build a query matching researchers who claim a given DOI.
pub fn doi_query(doi: &str) -> String {
    let clean = doi.strip_prefix("doi:").unwrap_or(doi);
    format!("digital-object-ids:\"{}\"", escape_query(clean))
}

fn escape_query(value: &str) -> String {
    value.replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Record section extraction
// ---------------------------------------------------------------------------

/// Prefer the credit name; otherwise combine given + family names.
pub fn extract_full_name(personal_details: &Value) -> String {
    let name = &personal_details["name"];
    if let Some(credit) = name["credit-name"]["value"].as_str() {
        if !credit.trim().is_empty() {
            return credit.to_string();
        }
    }
    let given = name["given-names"]["value"].as_str().unwrap_or("");
    let family = name["family-name"]["value"].as_str().unwrap_or("");
    format!("{} {}", given, family).trim().to_string()
}

/// Primary email if flagged; otherwise the first listed address.
pub fn extract_primary_email(emails: &Value) -> Option<String> {
    let list = emails["email"].as_array()?;
    list.iter()
        .find(|e| e["primary"].as_bool().unwrap_or(false))
        .or_else(|| list.first())
        .and_then(|e| e["email"].as_str())
        .map(String::from)
}

/// Biography text from a person section, when the researcher has written one.
pub fn extract_biography(person: &Value) -> Option<String> {
    let content = person["biography"]["content"].as_str()?.trim();
    if content.is_empty() {
        return None;
    }
    Some(content.to_string())
}

/// Current employment = first summary with no end-date. Returns the
/// organization name and a "City, Region, Country" location string.
pub fn extract_current_employment(employments: &Value) -> (Option<String>, Option<String>) {
    let groups = match employments["affiliation-group"].as_array() {
        Some(groups) => groups,
        None => return (None, None),
    };

    for group in groups {
        for wrapper in group["summaries"].as_array().unwrap_or(&Vec::new()) {
            let summary = &wrapper["employment-summary"];
            if !summary["end-date"].is_null() {
                continue;
            }
            let organization = &summary["organization"];
            let name = organization["name"].as_str().map(String::from);
            if name.is_none() {
                continue;
            }

            let address = &organization["address"];
            let location_parts: Vec<&str> = ["city", "region", "country"]
                .iter()
                .filter_map(|key| address[*key].as_str())
                .collect();
            let location = if location_parts.is_empty() {
                None
            } else {
                Some(location_parts.join(", "))
            };

            return (name, location);
        }
    }
    (None, None)
}

/// Flatten the grouped `/works` response, pulling the DOI out of the
/// external identifiers when present.
pub fn extract_work_summaries(works: &Value) -> Vec<WorkSummary> {
    let mut summaries = Vec::new();
    for group in works["group"].as_array().unwrap_or(&Vec::new()) {
        for summary in group["work-summary"].as_array().unwrap_or(&Vec::new()) {
            let doi = summary["external-ids"]["external-id"]
                .as_array()
                .and_then(|ids| {
                    ids.iter()
                        .find(|id| id["external-id-type"].as_str() == Some("doi"))
                        .and_then(|id| id["external-id-value"].as_str())
                })
                .map(String::from);

            let publication_year = summary["publication-date"]["year"]["value"]
                .as_str()
                .and_then(|y| y.parse().ok());

            summaries.push(WorkSummary {
                title: summary["title"]["title"]["value"]
                    .as_str()
                    .unwrap_or("Unknown Title")
                    .to_string(),
                work_type: summary["type"].as_str().unwrap_or("other").to_string(),
                doi,
                publication_year,
                journal: summary["journal-title"]["value"].as_str().map(String::from),
                url: summary["url"]["value"].as_str().map(String::from),
                put_code: summary["put-code"].as_i64(),
            });
        }
    }
    summaries
}

/// Parse an ORCID fuzzy date (`{"year": {"value": "2021"}, ...}`). Missing
/// month/day default to 1.
pub fn parse_orcid_date(date: &Value) -> Option<chrono::NaiveDate> {
    let year: i32 = date["year"]["value"].as_str()?.parse().ok()?;
    let month: u32 = date["month"]["value"]
        .as_str()
        .and_then(|m| m.parse().ok())
        .unwrap_or(1);
    let day: u32 = date["day"]["value"]
        .as_str()
        .and_then(|d| d.parse().ok())
        .unwrap_or(1);
    chrono::NaiveDate::from_ymd_opt(year, month, day)
}
