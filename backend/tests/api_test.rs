//! End-to-end API tests against a router wired to wiremock upstreams.
//!
//! The database pool is lazy, so endpoints that only proxy ORCID/CrossRef
//! run without PostgreSQL. DB-backed paths are covered by their services'
//! unit tests and the live test.

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scholar_hub_backend::api::{self, AppState};
use scholar_hub_backend::config::Config;
use scholar_hub_backend::db;
use scholar_hub_backend::services::citation_service::CitationService;
use scholar_hub_backend::services::crossref_client::CrossrefClient;
use scholar_hub_backend::services::metrics_service::MetricsService;
use scholar_hub_backend::services::oauth_service::OAuthService;
use scholar_hub_backend::services::orcid_client::OrcidClient;
use scholar_hub_backend::services::profile_sync_service::ProfileSyncService;

const ORCID_ID: &str = "0000-0002-1825-0097";

fn test_config(orcid_base: &str) -> Config {
    Config {
        database_url: "postgres://localhost:1/unreachable".into(),
        host: "127.0.0.1".into(),
        port: 0,
        orcid_base_url: orcid_base.to_string(),
        orcid_client_id: "APP-TEST".into(),
        orcid_client_secret: "secret".into(),
        orcid_redirect_uri: "http://localhost:8000/oauth/callback".into(),
        frontend_url: "http://localhost:8080".into(),
        session_secret: "test-secret".into(),
        session_ttl_hours: 24,
        crossref_user_agent: "ScholarHub-test/0.4".into(),
        cors_allowed_origins: "*".into(),
        demo_mode: false,
    }
}

/// Router with both upstreams pointed at the given mock server.
fn test_server(upstream: &MockServer) -> TestServer {
    let config = test_config(&upstream.uri());
    let pool = db::connect_lazy(&config.database_url).unwrap();
    let orcid = OrcidClient::new(upstream.uri()).unwrap();
    let crossref = CrossrefClient::with_base_url(upstream.uri(), &config.crossref_user_agent).unwrap();
    let oauth = OAuthService::new(&config);
    let citations = CitationService::new(orcid.clone(), crossref.clone());
    let metrics = MetricsService::new(pool.clone());
    let sync = ProfileSyncService::new(pool.clone(), orcid.clone(), citations.clone());

    let state = Arc::new(AppState {
        db: pool,
        config,
        orcid,
        crossref,
        oauth,
        citations,
        metrics,
        sync,
    });
    TestServer::new(api::router(state)).unwrap()
}

async fn mount_personal_details(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/personal-details", ORCID_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": {
                "given-names": { "value": "Josiah" },
                "family-name": { "value": "Carberry" }
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_user_identity_endpoint() {
    let upstream = MockServer::start().await;
    mount_personal_details(&upstream).await;
    // emails/employments fall through to a catch-all 404: identity degrades
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstream)
        .await;

    let server = test_server(&upstream);
    let response = server
        .get("/api/user-identity")
        .add_query_param("orcid_id", ORCID_ID)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "Josiah Carberry");
    assert_eq!(body["orcid_id"], ORCID_ID);
    assert_eq!(body["email"], Value::Null);
}

#[tokio::test]
async fn test_user_identity_rejects_bad_orcid_id() {
    let upstream = MockServer::start().await;
    let server = test_server(&upstream);

    let response = server
        .get("/api/user-identity")
        .add_query_param("orcid_id", "garbage")
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_current_user_identity_requires_session() {
    let upstream = MockServer::start().await;
    let server = test_server(&upstream);

    let response = server.get("/api/current-user-identity").await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_researcher_papers_most_recent_first() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{}/works", ORCID_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "group": [
                {
                    "work-summary": [{
                        "title": { "title": { "value": "Older" } },
                        "type": "journal-article",
                        "publication-date": { "year": { "value": "2010" } }
                    }]
                },
                {
                    "work-summary": [{
                        "title": { "title": { "value": "Newer" } },
                        "type": "journal-article",
                        "publication-date": { "year": { "value": "2023" } }
                    }]
                }
            ]
        })))
        .mount(&upstream)
        .await;

    let server = test_server(&upstream);
    let response = server
        .get("/api/researcher-papers")
        .add_query_param("orcid_id", ORCID_ID)
        .await;

    response.assert_status_ok();
    let papers: Value = response.json();
    assert_eq!(papers[0]["title"], "Newer");
    assert_eq!(papers[1]["title"], "Older");
}

#[tokio::test]
async fn test_citation_analysis_pipeline() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{}/works", ORCID_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "group": [{
                "work-summary": [{
                    "title": { "title": { "value": "Cited Work" } },
                    "type": "journal-article",
                    "publication-date": { "year": { "value": "2023" } },
                    "external-ids": {
                        "external-id": [{
                            "external-id-type": "doi",
                            "external-id-value": "10.5555/12345678"
                        }]
                    }
                }]
            }]
        })))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/works/10.5555/12345678"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "DOI": "10.5555/12345678",
                "title": ["Cited Work"],
                "is-referenced-by-count": 7,
                "references-count": 3
            }
        })))
        .mount(&upstream)
        .await;

    let server = test_server(&upstream);
    let response = server
        .get("/api/citation-analysis")
        .add_query_param("orcid_id", ORCID_ID)
        .add_query_param("years_back", "5")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["metrics"]["totalCitations"], 7);
    assert_eq!(body["metrics"]["totalPublications"], 1);
    assert_eq!(body["yearlyCitations"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_citation_metrics_falls_back_to_live_pipeline() {
    // DB is unreachable, so the stored-metrics read fails and the handler
    // must serve the live analysis instead.
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{}/works", ORCID_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "group": [{
                "work-summary": [{
                    "title": { "title": { "value": "Cited Work" } },
                    "type": "journal-article",
                    "publication-date": { "year": { "value": "2023" } },
                    "external-ids": {
                        "external-id": [{
                            "external-id-type": "doi",
                            "external-id-value": "10.5555/12345678"
                        }]
                    }
                }]
            }]
        })))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/works/10.5555/12345678"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "DOI": "10.5555/12345678",
                "title": ["Cited Work"],
                "is-referenced-by-count": 4,
                "references-count": 1
            }
        })))
        .mount(&upstream)
        .await;

    let server = test_server(&upstream);
    let response = server
        .get("/api/citation-metrics")
        .add_query_param("orcid_id", ORCID_ID)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["metrics"]["totalCitations"], 4);
}

#[tokio::test]
async fn test_citation_analysis_degrades_to_zero_series() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstream)
        .await;

    let server = test_server(&upstream);
    let response = server
        .get("/api/citation-analysis")
        .add_query_param("orcid_id", ORCID_ID)
        .add_query_param("years_back", "3")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["metrics"]["totalCitations"], 0);
    assert_eq!(body["yearlyCitations"].as_array().unwrap().len(), 3);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_publication_details() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/works/10.5555/12345678"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "DOI": "10.5555/12345678",
                "title": ["Toward a Unified Theory of High-Energy Metaphysics"],
                "container-title": ["Journal of Psychoceramics"],
                "is-referenced-by-count": 12,
                "references-count": 40,
                "published": { "date-parts": [[2008, 2]] },
                "author": [{ "given": "Josiah", "family": "Carberry" }]
            }
        })))
        .mount(&upstream)
        .await;

    let server = test_server(&upstream);
    let response = server
        .get("/api/publication-details")
        .add_query_param("doi", "10.5555/12345678")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["journal"], "Journal of Psychoceramics");
    assert_eq!(body["published_year"], 2008);
    assert_eq!(body["authors"][0]["family_name"], "Carberry");
    assert_eq!(body["citation_count"], 12);
}

#[tokio::test]
async fn test_search_researchers_passthrough() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "num-found": 1,
            "result": [{ "orcid-identifier": { "path": ORCID_ID } }]
        })))
        .mount(&upstream)
        .await;

    let server = test_server(&upstream);
    let response = server
        .get("/api/search-researchers")
        .add_query_param("family_name", "Carberry")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["num-found"], 1);
}

#[tokio::test]
async fn test_search_requires_some_query() {
    let upstream = MockServer::start().await;
    let server = test_server(&upstream);

    let response = server.get("/api/search-researchers").await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_oauth_authorize_redirects_to_registry() {
    let upstream = MockServer::start().await;
    let server = test_server(&upstream);

    let response = server.get("/oauth/authorize").await;
    assert_eq!(response.status_code().as_u16(), 307);

    let location = response.headers().get("location").unwrap().to_str().unwrap();
    assert!(location.starts_with(&format!("{}/oauth/authorize?", upstream.uri())));
    assert!(location.contains("client_id=APP-TEST"));
    assert!(location.contains("response_type=code"));

    let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
    assert!(cookie.starts_with("sh_oauth_state="));
}

#[tokio::test]
async fn test_oauth_callback_error_redirects_to_frontend() {
    let upstream = MockServer::start().await;
    let server = test_server(&upstream);

    let response = server
        .get("/oauth/callback")
        .add_query_param("error", "access_denied")
        .await;

    assert_eq!(response.status_code().as_u16(), 307);
    let location = response.headers().get("location").unwrap().to_str().unwrap();
    assert!(location.starts_with("http://localhost:8080/auth/error?error="));
}

#[tokio::test]
async fn test_oauth_callback_rejects_token_without_valid_orcid() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-123",
            "token_type": "bearer",
            "orcid": "not-an-orcid-id",
            "name": "Josiah Carberry"
        })))
        .mount(&upstream)
        .await;
    let server = test_server(&upstream);

    let response = server
        .get("/oauth/callback")
        .add_query_param("code", "abc")
        .add_query_param("state", "teststate")
        .add_header(
            axum::http::header::COOKIE,
            axum::http::HeaderValue::from_static("sh_oauth_state=teststate"),
        )
        .await;

    assert_eq!(response.status_code().as_u16(), 307);
    let location = response.headers().get("location").unwrap().to_str().unwrap();
    assert!(location.starts_with("http://localhost:8080/auth/error?error="));
}

#[tokio::test]
async fn test_oauth_status() {
    let upstream = MockServer::start().await;
    let server = test_server(&upstream);

    let response = server.get("/oauth/status").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["configured"], true);
}

#[tokio::test]
async fn test_social_media_post_requires_session() {
    let upstream = MockServer::start().await;
    let server = test_server(&upstream);

    let response = server
        .post("/api/social-media")
        .json(&json!({
            "platform": "github",
            "username": "jcarberry",
            "url": "https://github.com/jcarberry"
        }))
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_demo_mode_blocks_writes() {
    let upstream = MockServer::start().await;
    let config = {
        let mut config = test_config(&upstream.uri());
        config.demo_mode = true;
        config
    };
    let pool = db::connect_lazy(&config.database_url).unwrap();
    let orcid = OrcidClient::new(upstream.uri()).unwrap();
    let crossref =
        CrossrefClient::with_base_url(upstream.uri(), &config.crossref_user_agent).unwrap();
    let oauth = OAuthService::new(&config);
    let citations = CitationService::new(orcid.clone(), crossref.clone());
    let metrics = MetricsService::new(pool.clone());
    let sync = ProfileSyncService::new(pool.clone(), orcid.clone(), citations.clone());
    let state = Arc::new(AppState {
        db: pool,
        config,
        orcid,
        crossref,
        oauth,
        citations,
        metrics,
        sync,
    });
    let server = TestServer::new(api::router(state)).unwrap();

    let response = server
        .post("/api/social-media")
        .json(&json!({ "platform": "github", "username": "x", "url": "https://github.com/x" }))
        .await;
    response.assert_status_forbidden();
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let upstream = MockServer::start().await;
    let server = test_server(&upstream);

    let response = server.get("/api/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "unavailable");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let upstream = MockServer::start().await;
    let server = test_server(&upstream);

    let response = server.get("/api-docs/openapi.json").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["info"]["title"], "Scholar Hub API");
}
