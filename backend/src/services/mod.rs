//! Domain services and upstream API clients.

pub mod citation_service;
pub mod crossref_client;
pub mod metrics_service;
pub mod oauth_service;
pub mod orcid_client;
pub mod profile_sync_service;
pub mod scheduler_service;
