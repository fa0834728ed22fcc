//! Researcher accounts linked to ORCID iDs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// A registered researcher. ORCID tokens are never serialized into API
/// responses.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub orcid_id: Option<String>,
    #[serde(skip_serializing)]
    pub orcid_access_token: Option<String>,
    #[serde(skip_serializing)]
    pub orcid_refresh_token: Option<String>,
    pub display_name: String,
    pub biography: String,
    pub profile_picture_url: String,
    pub website_url: String,
    pub social_accounts: Json<Vec<SocialAccount>>,
    pub profile_public: bool,
    pub show_publications: bool,
    pub show_affiliations: bool,
    pub show_metrics: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_orcid_sync: Option<DateTime<Utc>>,
}

/// A user-declared social media handle stored in the `social_accounts`
/// JSONB column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SocialAccount {
    /// Platform identifier, e.g. "twitter", "linkedin", "github"
    pub platform: String,
    pub username: String,
    pub url: String,
}
