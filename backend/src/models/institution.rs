use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A research institution referenced by affiliations.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Institution {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    pub city: String,
    pub ror_id: String,
    pub website_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
