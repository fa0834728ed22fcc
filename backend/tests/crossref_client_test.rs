//! Wiremock-backed tests for the CrossRef client.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scholar_hub_backend::error::AppError;
use scholar_hub_backend::services::crossref_client::CrossrefClient;

const UA: &str = "ScholarHub-test/0.4 (mailto:dev@example.org)";

fn client(server: &MockServer) -> CrossrefClient {
    CrossrefClient::with_base_url(server.uri(), UA).unwrap()
}

#[tokio::test]
async fn test_work_unwraps_message_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works/10.5555/12345678"))
        .and(header("User-Agent", UA))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "message-type": "work",
            "message": {
                "DOI": "10.5555/12345678",
                "title": ["The Memory Bus Considered Harmful"],
                "is-referenced-by-count": 12,
                "references-count": 40
            }
        })))
        .mount(&server)
        .await;

    let work = client(&server)
        .work("10.5555/12345678", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(work["DOI"], "10.5555/12345678");
    assert_eq!(work["is-referenced-by-count"], 12);
}

#[tokio::test]
async fn test_citation_info_counts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works/10.5555/12345678"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "DOI": "10.5555/12345678",
                "title": ["The Memory Bus Considered Harmful"],
                "is-referenced-by-count": 12,
                "references-count": 40
            }
        })))
        .mount(&server)
        .await;

    let info = client(&server)
        .citation_info("doi:10.5555/12345678", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(info.citation_count, 12);
    assert_eq!(info.reference_count, 40);
    assert_eq!(info.title, "The Memory Bus Considered Harmful");
}

#[tokio::test]
async fn test_unknown_doi_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server)
        .work("10.5555/does-not-exist", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_invalid_doi_rejected_before_any_request() {
    let server = MockServer::start().await;
    let err = client(&server)
        .work("not-a-doi", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_search_paging_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("query", "psychoceramics"))
        .and(query_param("rows", "20"))
        .and(query_param("offset", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "total-results": 2, "items": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = client(&server).search("psychoceramics", 20, 40).await.unwrap();
    assert_eq!(results["total-results"], 2);
}
