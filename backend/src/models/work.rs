//! Research works and their author links.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A research output (publication, dataset, software release, ...).
/// `citation_count` is a cache of the CrossRef `is-referenced-by-count`
/// value from the last refresh.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Work {
    pub id: Uuid,
    pub title: String,
    pub work_type: String,
    pub journal_title: String,
    pub publication_date: Option<NaiveDate>,
    pub publication_year: Option<i32>,
    pub doi: Option<String>,
    pub url: String,
    pub orcid_put_code: String,
    pub citation_count: i32,
    pub last_citation_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Join row tying a work to an author. `user_id` is set only when the
/// author is a registered user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WorkAuthor {
    pub id: Uuid,
    pub work_id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub orcid_id: String,
    pub author_order: i32,
    pub is_corresponding: bool,
    pub created_at: DateTime<Utc>,
}
