//! ORCID profile synchronization.
//!
//! Pulls a researcher's public record into PostgreSQL: identity, employments
//! and educations, funding, works with DOIs, citation time series, and the
//! recomputed metrics row. Individual item failures log a warning and the
//! sync continues; only a failure to resolve the researcher at all aborts.

use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::user::User;
use crate::services::citation_service::{AnalysisOptions, CitationService};
use crate::services::crossref_client;
use crate::services::metrics_service::MetricsService;
use crate::services::orcid_client::{
    extract_biography, extract_work_summaries, normalize_orcid_id, parse_orcid_date, OrcidClient,
};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Cap on works stored and looked up against CrossRef.
    pub max_publications: usize,
    /// Skip the CrossRef pipeline entirely (profile data only).
    pub skip_citations: bool,
    /// Sync even when the profile was refreshed recently.
    pub force: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_publications: 20,
            skip_citations: false,
            force: false,
        }
    }
}

/// Outcome counters for one sync run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SyncReport {
    pub orcid_id: String,
    pub affiliations_synced: usize,
    pub funding_synced: usize,
    pub works_synced: usize,
    pub citations_updated: bool,
    pub skipped: bool,
}

/// Profiles refreshed within this window are skipped unless forced.
const FRESHNESS_HOURS: i64 = 6;

#[derive(Debug, Clone)]
pub struct ProfileSyncService {
    db: PgPool,
    orcid: OrcidClient,
    citations: CitationService,
    metrics: MetricsService,
}

impl ProfileSyncService {
    pub fn new(db: PgPool, orcid: OrcidClient, citations: CitationService) -> Self {
        let metrics = MetricsService::new(db.clone());
        Self {
            db,
            orcid,
            citations,
            metrics,
        }
    }

    /// Sync one researcher by ORCID iD, creating the user row if needed.
    pub async fn sync(&self, orcid_id: &str, options: &SyncOptions) -> Result<SyncReport> {
        let orcid_id = normalize_orcid_id(orcid_id);
        let mut report = SyncReport {
            orcid_id: orcid_id.clone(),
            ..Default::default()
        };

        let user = self.ensure_user(&orcid_id).await?;

        if !options.force && is_fresh(&user) {
            tracing::debug!(orcid_id, "profile is fresh, skipping sync");
            report.skipped = true;
            return Ok(report);
        }

        let identity = self.orcid.identity(&orcid_id).await?;
        let biography = match self.orcid.person(&orcid_id).await {
            Ok(person) => extract_biography(&person),
            Err(e) => {
                tracing::debug!(orcid_id, error = %e, "person section fetch failed");
                None
            }
        };
        self.update_identity(
            user.id,
            &identity.name,
            identity.email.as_deref(),
            biography.as_deref(),
        )
        .await?;

        report.affiliations_synced = self.sync_affiliations(user.id, &orcid_id).await;
        report.funding_synced = self.sync_funding(user.id, &orcid_id).await;
        report.works_synced = self
            .sync_works(user.id, &orcid_id, options.max_publications)
            .await?;

        if !options.skip_citations {
            report.citations_updated = self.sync_citations(user.id, &orcid_id, options).await;
        }

        self.metrics.recompute(user.id).await?;
        self.mark_synced(user.id).await?;

        tracing::info!(
            orcid_id,
            works = report.works_synced,
            affiliations = report.affiliations_synced,
            "profile sync complete"
        );
        Ok(report)
    }

    async fn ensure_user(&self, orcid_id: &str) -> Result<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, orcid_id)
             VALUES ($1, $1)
             ON CONFLICT (orcid_id) DO UPDATE SET updated_at = NOW()
             RETURNING *",
        )
        .bind(orcid_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn update_identity(
        &self,
        user_id: Uuid,
        display_name: &str,
        email: Option<&str>,
        biography: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET display_name = $2, email = COALESCE($3, email),
             biography = COALESCE($4, biography), updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(display_name)
        .bind(email)
        .bind(biography)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn mark_synced(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET last_orcid_sync = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn sync_affiliations(&self, user_id: Uuid, orcid_id: &str) -> usize {
        let mut synced = 0;
        for (kind, section) in [
            ("employment", self.orcid.employments(orcid_id).await),
            ("education", self.orcid.educations(orcid_id).await),
        ] {
            let section = match section {
                Ok(section) => section,
                Err(e) => {
                    tracing::warn!(orcid_id, kind, error = %e, "affiliation fetch failed");
                    continue;
                }
            };
            for summary in affiliation_summaries(&section, kind) {
                match self.upsert_affiliation(user_id, kind, &summary).await {
                    Ok(()) => synced += 1,
                    Err(e) => {
                        tracing::warn!(orcid_id, kind, error = %e, "affiliation upsert failed");
                    }
                }
            }
        }
        synced
    }

    async fn upsert_affiliation(
        &self,
        user_id: Uuid,
        kind: &str,
        summary: &AffiliationSummary,
    ) -> Result<()> {
        let institution_id: (Uuid,) = sqlx::query_as(
            "INSERT INTO institutions (name, city, country)
             VALUES ($1, $2, $3)
             ON CONFLICT (name) DO UPDATE SET updated_at = NOW()
             RETURNING id",
        )
        .bind(&summary.organization)
        .bind(&summary.city)
        .bind(&summary.country)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query(
            "INSERT INTO affiliations (
                user_id, institution_id, affiliation_type, title, department,
                start_date, end_date, is_current, orcid_put_code
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (user_id, institution_id, affiliation_type, title)
             DO UPDATE SET
                department = EXCLUDED.department,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                is_current = EXCLUDED.is_current,
                orcid_put_code = EXCLUDED.orcid_put_code,
                updated_at = NOW()",
        )
        .bind(user_id)
        .bind(institution_id.0)
        .bind(kind)
        .bind(&summary.title)
        .bind(&summary.department)
        .bind(summary.start_date)
        .bind(summary.end_date)
        .bind(summary.end_date.is_none())
        .bind(&summary.put_code)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn sync_funding(&self, user_id: Uuid, orcid_id: &str) -> usize {
        let section = match self.orcid.fundings(orcid_id).await {
            Ok(section) => section,
            Err(e) => {
                tracing::warn!(orcid_id, error = %e, "funding fetch failed");
                return 0;
            }
        };

        let mut synced = 0;
        for summary in funding_summaries(&section) {
            let result = sqlx::query(
                "INSERT INTO funding (
                    user_id, title, funding_type, organization_name,
                    organization_country, start_date, end_date, url, orcid_put_code
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (user_id, title) DO UPDATE SET
                    funding_type = EXCLUDED.funding_type,
                    organization_name = EXCLUDED.organization_name,
                    organization_country = EXCLUDED.organization_country,
                    start_date = EXCLUDED.start_date,
                    end_date = EXCLUDED.end_date,
                    url = EXCLUDED.url,
                    orcid_put_code = EXCLUDED.orcid_put_code,
                    updated_at = NOW()",
            )
            .bind(user_id)
            .bind(&summary.title)
            .bind(&summary.funding_type)
            .bind(&summary.organization)
            .bind(&summary.country)
            .bind(summary.start_date)
            .bind(summary.end_date)
            .bind(&summary.url)
            .bind(&summary.put_code)
            .execute(&self.db)
            .await;

            match result {
                Ok(_) => synced += 1,
                Err(e) => tracing::warn!(orcid_id, error = %e, "funding upsert failed"),
            }
        }
        synced
    }

    /// Store works carrying a DOI, most recent first, capped.
    async fn sync_works(
        &self,
        user_id: Uuid,
        orcid_id: &str,
        max_publications: usize,
    ) -> Result<usize> {
        let works = self.orcid.works(orcid_id).await?;
        let mut summaries: Vec<_> = extract_work_summaries(&works)
            .into_iter()
            .filter(|w| w.doi.is_some())
            .collect();
        summaries.sort_by(|a, b| b.publication_year.cmp(&a.publication_year));
        summaries.truncate(max_publications);

        let mut synced = 0;
        for summary in &summaries {
            let doi = crossref_client::normalize_doi(summary.doi.as_deref().unwrap_or(""));
            let result: std::result::Result<(Uuid,), sqlx::Error> = sqlx::query_as(
                "INSERT INTO works (
                    title, work_type, journal_title, publication_year, doi, url, orcid_put_code
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (doi) DO UPDATE SET
                    title = EXCLUDED.title,
                    work_type = EXCLUDED.work_type,
                    journal_title = EXCLUDED.journal_title,
                    publication_year = EXCLUDED.publication_year,
                    updated_at = NOW()
                 RETURNING id",
            )
            .bind(&summary.title)
            .bind(&summary.work_type)
            .bind(summary.journal.as_deref().unwrap_or(""))
            .bind(summary.publication_year)
            .bind(&doi)
            .bind(summary.url.as_deref().unwrap_or(""))
            .bind(summary.put_code.map(|c| c.to_string()).unwrap_or_default())
            .fetch_one(&self.db)
            .await;

            let work_id = match result {
                Ok((id,)) => id,
                Err(e) => {
                    tracing::warn!(orcid_id, doi, error = %e, "work upsert failed");
                    continue;
                }
            };

            let author = sqlx::query(
                "INSERT INTO work_authors (work_id, user_id, name, orcid_id)
                 SELECT $1, $2, display_name, $3 FROM users WHERE id = $2
                 ON CONFLICT (work_id, user_id) DO NOTHING",
            )
            .bind(work_id)
            .bind(user_id)
            .bind(orcid_id)
            .execute(&self.db)
            .await;

            match author {
                Ok(_) => synced += 1,
                Err(e) => tracing::warn!(orcid_id, doi, error = %e, "author link failed"),
            }
        }
        Ok(synced)
    }

    /// Run the citation pipeline and persist both the per-work counts and
    /// the yearly series.
    async fn sync_citations(&self, user_id: Uuid, orcid_id: &str, options: &SyncOptions) -> bool {
        let analysis_options = AnalysisOptions {
            max_publications: options.max_publications,
            ..Default::default()
        };
        let analysis = self.citations.analyze(orcid_id, &analysis_options).await;
        if analysis.error.is_some() {
            return false;
        }

        // Cache each resolved count on its work row; recompute reads these.
        for work in &analysis.works {
            if let Err(e) = sqlx::query(
                "UPDATE works SET citation_count = $2, last_citation_update = NOW(),
                 updated_at = NOW() WHERE doi = $1",
            )
            .bind(&work.doi)
            .bind(work.citation_count as i32)
            .execute(&self.db)
            .await
            {
                tracing::warn!(orcid_id, doi = %work.doi, error = %e, "citation count update failed");
            }
        }

        if let Err(e) = self
            .metrics
            .store_citation_series(user_id, &analysis.yearly_citations)
            .await
        {
            tracing::warn!(orcid_id, error = %e, "citation series store failed");
            return false;
        }
        true
    }
}

fn is_fresh(user: &User) -> bool {
    user.last_orcid_sync
        .map(|at| Utc::now() - at < chrono::Duration::hours(FRESHNESS_HOURS))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Section flattening
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct AffiliationSummary {
    organization: String,
    city: String,
    country: String,
    title: String,
    department: String,
    start_date: Option<chrono::NaiveDate>,
    end_date: Option<chrono::NaiveDate>,
    put_code: String,
}

/// Flatten an employments/educations section. The summary key inside each
/// group is named after the section kind.
fn affiliation_summaries(section: &Value, kind: &str) -> Vec<AffiliationSummary> {
    let key = format!("{}-summary", kind);
    let mut out = Vec::new();
    for group in section["affiliation-group"].as_array().unwrap_or(&Vec::new()) {
        for item in group["summaries"].as_array().unwrap_or(&Vec::new()) {
            let summary = &item[&key];
            let organization = summary["organization"]["name"]
                .as_str()
                .unwrap_or("")
                .to_string();
            if organization.is_empty() {
                continue;
            }
            let address = &summary["organization"]["address"];
            out.push(AffiliationSummary {
                organization,
                city: address["city"].as_str().unwrap_or("").to_string(),
                country: address["country"].as_str().unwrap_or("").to_string(),
                title: summary["role-title"].as_str().unwrap_or("").to_string(),
                department: summary["department-name"].as_str().unwrap_or("").to_string(),
                start_date: parse_orcid_date(&summary["start-date"]),
                end_date: parse_orcid_date(&summary["end-date"]),
                put_code: summary["put-code"]
                    .as_i64()
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
            });
        }
    }
    out
}

#[derive(Debug, Clone)]
struct FundingSummary {
    title: String,
    funding_type: String,
    organization: String,
    country: String,
    start_date: Option<chrono::NaiveDate>,
    end_date: Option<chrono::NaiveDate>,
    url: String,
    put_code: String,
}

fn funding_summaries(section: &Value) -> Vec<FundingSummary> {
    let mut out = Vec::new();
    for group in section["group"].as_array().unwrap_or(&Vec::new()) {
        for summary in group["funding-summary"].as_array().unwrap_or(&Vec::new()) {
            let title = summary["title"]["title"]["value"]
                .as_str()
                .unwrap_or("")
                .to_string();
            if title.is_empty() {
                continue;
            }
            out.push(FundingSummary {
                title,
                funding_type: summary["type"].as_str().unwrap_or("grant").to_string(),
                organization: summary["organization"]["name"]
                    .as_str()
                    .unwrap_or("")
                    .to_string(),
                country: summary["organization"]["address"]["country"]
                    .as_str()
                    .unwrap_or("")
                    .to_string(),
                start_date: parse_orcid_date(&summary["start-date"]),
                end_date: parse_orcid_date(&summary["end-date"]),
                url: summary["url"]["value"].as_str().unwrap_or("").to_string(),
                put_code: summary["put-code"]
                    .as_i64()
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_affiliation_summaries_flatten() {
        let section = json!({
            "affiliation-group": [{
                "summaries": [{
                    "employment-summary": {
                        "organization": {
                            "name": "University of Oslo",
                            "address": { "city": "Oslo", "country": "NO" }
                        },
                        "role-title": "Professor",
                        "department-name": "Informatics",
                        "start-date": { "year": { "value": "2018" }, "month": { "value": "9" } },
                        "end-date": null,
                        "put-code": 12345
                    }
                }]
            }]
        });
        let summaries = affiliation_summaries(&section, "employment");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].organization, "University of Oslo");
        assert_eq!(summaries[0].title, "Professor");
        assert!(summaries[0].end_date.is_none());
        assert_eq!(
            summaries[0].start_date,
            chrono::NaiveDate::from_ymd_opt(2018, 9, 1)
        );
        assert_eq!(summaries[0].put_code, "12345");
    }

    #[test]
    fn test_affiliation_summaries_skip_nameless_org() {
        let section = json!({
            "affiliation-group": [{
                "summaries": [{ "employment-summary": { "organization": {} } }]
            }]
        });
        assert!(affiliation_summaries(&section, "employment").is_empty());
    }

    #[test]
    fn test_funding_summaries_flatten() {
        let section = json!({
            "group": [{
                "funding-summary": [{
                    "title": { "title": { "value": "Widget Grant" } },
                    "type": "grant",
                    "organization": {
                        "name": "Research Council",
                        "address": { "country": "NO" }
                    },
                    "start-date": { "year": { "value": "2020" } },
                    "put-code": 99
                }]
            }]
        });
        let summaries = funding_summaries(&section);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].title, "Widget Grant");
        assert_eq!(summaries[0].organization, "Research Council");
        assert_eq!(summaries[0].country, "NO");
    }

    #[test]
    fn test_funding_summaries_skip_untitled() {
        let section = json!({ "group": [{ "funding-summary": [{ "type": "grant" }] }] });
        assert!(funding_summaries(&section).is_empty());
    }

    #[test]
    fn test_freshness_window() {
        let mut user = fixture_user();
        assert!(!is_fresh(&user));
        user.last_orcid_sync = Some(Utc::now());
        assert!(is_fresh(&user));
        user.last_orcid_sync = Some(Utc::now() - chrono::Duration::hours(FRESHNESS_HOURS + 1));
        assert!(!is_fresh(&user));
    }

    fn fixture_user() -> User {
        User {
            id: Uuid::nil(),
            username: "0000-0002-1825-0097".into(),
            email: None,
            orcid_id: Some("0000-0002-1825-0097".into()),
            orcid_access_token: None,
            orcid_refresh_token: None,
            display_name: "Jane Doe".into(),
            biography: String::new(),
            profile_picture_url: String::new(),
            website_url: String::new(),
            social_accounts: sqlx::types::Json(Vec::new()),
            profile_public: true,
            show_publications: true,
            show_affiliations: true,
            show_metrics: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_orcid_sync: None,
        }
    }
}
