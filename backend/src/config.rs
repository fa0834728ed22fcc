//! Environment-driven application configuration.
//!
//! Loaded once at startup from the process environment (a `.env` file is
//! merged in first via dotenvy). ORCID API base URLs are derived from
//! `ORCID_BASE_URL`: the sandbox registry maps to the sandbox public API,
//! everything else to the production public API.

use crate::error::{AppError, Result};

/// Runtime configuration for the Scholar Hub backend.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string
    pub database_url: String,
    /// Bind address for the HTTP server
    pub host: String,
    pub port: u16,

    /// ORCID registry base URL (production `https://orcid.org` or sandbox)
    pub orcid_base_url: String,
    pub orcid_client_id: String,
    pub orcid_client_secret: String,
    /// Redirect URI registered with ORCID for the OAuth callback
    pub orcid_redirect_uri: String,

    /// Frontend SPA origin used for post-auth redirects
    pub frontend_url: String,
    /// Secret for signing session tokens
    pub session_secret: String,
    /// Session lifetime in hours
    pub session_ttl_hours: i64,

    /// Contact User-Agent sent to CrossRef (polite pool)
    pub crossref_user_agent: String,

    /// Comma-separated list of allowed CORS origins ("*" allows any)
    pub cors_allowed_origins: String,
    /// When enabled, write endpoints outside the OAuth flow are rejected
    pub demo_mode: bool,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: optional("HOST", "0.0.0.0"),
            port: optional("PORT", "8000")
                .parse()
                .map_err(|_| AppError::Config("PORT must be a number".into()))?,
            orcid_base_url: optional("ORCID_BASE_URL", "https://orcid.org"),
            orcid_client_id: required("ORCID_CLIENT_ID")?,
            orcid_client_secret: required("ORCID_CLIENT_SECRET")?,
            orcid_redirect_uri: required("ORCID_REDIRECT_URI")?,
            frontend_url: optional("FRONTEND_URL", "http://localhost:8080"),
            session_secret: required("SESSION_SECRET")?,
            session_ttl_hours: optional("SESSION_TTL_HOURS", "24")
                .parse()
                .map_err(|_| AppError::Config("SESSION_TTL_HOURS must be a number".into()))?,
            crossref_user_agent: optional(
                "CROSSREF_USER_AGENT",
                "ScholarHub/0.4 (mailto:support@scholarhub.example)",
            ),
            cors_allowed_origins: optional("CORS_ALLOWED_ORIGINS", "*"),
            demo_mode: optional("DEMO_MODE", "false") == "true",
        })
    }

    /// Public ORCID API base, derived from the registry base URL.
    pub fn orcid_api_base(&self) -> String {
        if self.orcid_base_url.contains("sandbox.orcid.org") {
            "https://pub.sandbox.orcid.org/v3.0".to_string()
        } else {
            "https://pub.orcid.org/v3.0".to_string()
        }
    }

    /// OAuth token endpoint on the ORCID registry.
    pub fn orcid_token_url(&self) -> String {
        format!("{}/oauth/token", self.orcid_base_url)
    }

    /// OAuth authorize endpoint on the ORCID registry.
    pub fn orcid_authorize_url(&self) -> String {
        format!("{}/oauth/authorize", self.orcid_base_url)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Fixture shared by unit tests across the crate.
    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            database_url: "postgres://localhost/scholarhub".into(),
            host: "127.0.0.1".into(),
            port: 8000,
            orcid_base_url: "https://orcid.org".into(),
            orcid_client_id: "APP-TEST".into(),
            orcid_client_secret: "secret".into(),
            orcid_redirect_uri: "http://localhost:8000/oauth/callback".into(),
            frontend_url: "http://localhost:8080".into(),
            session_secret: "test-secret".into(),
            session_ttl_hours: 24,
            crossref_user_agent: "ScholarHub/test".into(),
            cors_allowed_origins: "*".into(),
            demo_mode: false,
        }
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| AppError::Config(format!("{} is not set", key)))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::test_config()
    }

    #[test]
    fn test_production_api_base() {
        let config = test_config();
        assert_eq!(config.orcid_api_base(), "https://pub.orcid.org/v3.0");
    }

    #[test]
    fn test_sandbox_api_base() {
        let mut config = test_config();
        config.orcid_base_url = "https://sandbox.orcid.org".into();
        assert_eq!(
            config.orcid_api_base(),
            "https://pub.sandbox.orcid.org/v3.0"
        );
    }

    #[test]
    fn test_token_url() {
        let config = test_config();
        assert_eq!(config.orcid_token_url(), "https://orcid.org/oauth/token");
    }

    #[test]
    fn test_bind_addr() {
        let config = test_config();
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
    }
}
