//! Shared input validation helpers.
//!
//! Centralizes identifier and URL validation used across handlers so the
//! rules live in one place.

use crate::error::{AppError, Result};
use crate::services::crossref_client;
use crate::services::orcid_client;

/// Validate and normalize an ORCID iD query parameter.
pub fn require_orcid_id(raw: &str) -> Result<String> {
    let normalized = orcid_client::normalize_orcid_id(raw);
    if !orcid_client::is_valid_orcid_id(&normalized) {
        return Err(AppError::Validation(format!("Invalid ORCID iD: {}", raw)));
    }
    Ok(normalized)
}

/// Validate and normalize a DOI parameter.
pub fn require_doi(raw: &str) -> Result<String> {
    let normalized = crossref_client::normalize_doi(raw);
    if !crossref_client::is_valid_doi(&normalized) {
        return Err(AppError::Validation(format!("Invalid DOI: {}", raw)));
    }
    Ok(normalized)
}

/// Validate a user-supplied profile link (social accounts, websites).
/// Only http(s) URLs with a proper host are accepted.
pub fn validate_profile_link(url_str: &str, label: &str) -> Result<()> {
    let parsed = url::Url::parse(url_str)
        .map_err(|_| AppError::Validation(format!("Invalid {}", label)))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(AppError::Validation(format!(
            "{} must use http or https",
            label
        )));
    }

    if parsed.host_str().is_none() {
        return Err(AppError::Validation(format!("{} must have a host", label)));
    }
    Ok(())
}

/// Clamp a page size to the given ceiling, defaulting when absent.
pub fn clamp_rows(rows: Option<u32>, default: u32, max: u32) -> u32 {
    rows.unwrap_or(default).min(max).max(1)
}
