//! ORCID OAuth2 token exchange.
//!
//! ORCID's token endpoint speaks form-encoded requests and returns the
//! member's ORCID iD and name alongside the access token, so the callback
//! handler can identify the user without an extra round trip.

use serde::Deserialize;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Token endpoint response. `orcid` and `name` are ORCID extensions to the
/// standard OAuth2 shape.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
    pub orcid: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthService {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl OAuthService {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: config.orcid_token_url(),
            client_id: config.orcid_client_id.clone(),
            client_secret: config.orcid_client_secret.clone(),
            redirect_uri: config.orcid_redirect_uri.clone(),
        }
    }

    /// Build the authorization URL the frontend should redirect the user to.
    pub fn authorization_url(&self, authorize_endpoint: &str, state: &str) -> Result<String> {
        let mut url = url::Url::parse(authorize_endpoint)
            .map_err(|e| AppError::Config(format!("Invalid authorize URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", "/authenticate")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Exchange the authorization code returned to the callback endpoint for
    /// an access token.
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    /// Fetch a `/read-public` token via client credentials. Used for profile
    /// syncs that run without a user session.
    pub async fn client_credentials_token(&self) -> Result<TokenResponse> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", "/read-public"),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let resp = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "ORCID token request rejected");
            return Err(AppError::Authentication(format!(
                "Token exchange failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = resp.json().await?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_service() -> OAuthService {
        OAuthService::new(&Config::test_config())
    }

    #[test]
    fn test_authorization_url_contains_oauth_params() {
        let url = test_service()
            .authorization_url("https://sandbox.orcid.org/oauth/authorize", "abc123")
            .unwrap();
        assert!(url.starts_with("https://sandbox.orcid.org/oauth/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=%2Fauthenticate"));
        assert!(url.contains("state=abc123"));
    }

    #[test]
    fn test_authorization_url_rejects_garbage_endpoint() {
        let err = test_service().authorization_url("not a url", "s").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_token_response_parses_orcid_extensions() {
        let token: TokenResponse = serde_json::from_str(
            r#"{
                "access_token": "tok",
                "token_type": "bearer",
                "refresh_token": "ref",
                "expires_in": 631138518,
                "scope": "/authenticate",
                "orcid": "0000-0002-1825-0097",
                "name": "Jane Doe"
            }"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "tok");
        assert_eq!(token.orcid.as_deref(), Some("0000-0002-1825-0097"));
        assert_eq!(token.name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_token_response_minimal_shape() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token": "tok", "token_type": "bearer"}"#).unwrap();
        assert!(token.orcid.is_none());
        assert!(token.expires_in.is_none());
    }
}
