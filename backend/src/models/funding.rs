use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A grant or other funding item from the ORCID `/fundings` section.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Funding {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub funding_type: String,
    pub organization_name: String,
    pub organization_country: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub url: String,
    pub orcid_put_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
