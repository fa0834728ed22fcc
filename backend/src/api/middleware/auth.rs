//! Session cookie middleware.
//!
//! After the OAuth callback the server mints a signed JWT and sets it as the
//! `sh_session` cookie. `load_session` decodes the cookie on every request
//! and stashes the claims as a request extension; handlers that need a
//! logged-in user pull them out via the [`CurrentSession`] extractor.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::api::SharedState;
use crate::config::Config;
use crate::error::{AppError, Result};

pub const SESSION_COOKIE: &str = "sh_session";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// ORCID iD of the logged-in researcher
    pub sub: String,
    /// Display name captured at login
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Mint a session token for a freshly authenticated researcher.
pub fn mint_session(config: &Config, orcid_id: &str, name: &str) -> Result<String> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: orcid_id.to_string(),
        name: name.to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(config.session_ttl_hours)).timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify_session(config: &Config, token: &str) -> Result<SessionClaims> {
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.session_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// `Set-Cookie` value for a new session. HttpOnly so the SPA never touches
/// the token directly.
pub fn session_cookie(config: &Config, token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        config.session_ttl_hours * 3600
    )
}

/// Decode the session cookie, if any, and attach the claims to the request.
/// Invalid or expired cookies are treated as anonymous.
pub async fn load_session(
    State(state): State<SharedState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| cookie_value(cookies, SESSION_COOKIE));

    if let Some(token) = token {
        match verify_session(&state.config, &token) {
            Ok(claims) => {
                request.extensions_mut().insert(claims);
            }
            Err(e) => {
                tracing::debug!(error = %e, "session cookie rejected");
            }
        }
    }

    next.run(request).await
}

/// Extractor for handlers that require a logged-in researcher.
pub struct CurrentSession(pub SessionClaims);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<SessionClaims>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| AppError::Unauthorized("Login required".into()))
    }
}

/// Pull one cookie out of a `Cookie` header value.
fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Cookie parsing
    // -----------------------------------------------------------------------

    #[test]
    fn test_cookie_value_found() {
        let header = "theme=dark; sh_session=abc.def.ghi; lang=en";
        assert_eq!(cookie_value(header, "sh_session").as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_cookie_value_missing() {
        assert!(cookie_value("theme=dark", "sh_session").is_none());
        assert!(cookie_value("", "sh_session").is_none());
    }

    // -----------------------------------------------------------------------
    // Token round trip
    // -----------------------------------------------------------------------

    #[test]
    fn test_mint_and_verify_session() {
        let config = Config::test_config();
        let token = mint_session(&config, "0000-0002-1825-0097", "Jane Doe").unwrap();
        let claims = verify_session(&config, &token).unwrap();
        assert_eq!(claims.sub, "0000-0002-1825-0097");
        assert_eq!(claims.name, "Jane Doe");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let config = Config::test_config();
        let token = mint_session(&config, "0000-0002-1825-0097", "Jane Doe").unwrap();
        let mut other = Config::test_config();
        other.session_secret = "different".into();
        assert!(matches!(
            verify_session(&other, &token).unwrap_err(),
            AppError::Jwt(_)
        ));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let config = Config::test_config();
        let cookie = session_cookie(&config, "tok");
        assert!(cookie.starts_with("sh_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));
    }
}
