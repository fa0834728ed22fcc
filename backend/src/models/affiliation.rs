use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A user's tie to an institution (employment, education, etc.), mirrored
/// from the matching ORCID record section. `affiliation_type` holds the
/// ORCID section name in snake_case.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Affiliation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institution_id: Uuid,
    pub affiliation_type: String,
    pub title: String,
    pub department: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub orcid_put_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
