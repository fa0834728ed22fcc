//! OpenAPI specification served at /api-docs/openapi.json.

use utoipa::OpenApi;

/// Top-level OpenAPI document for the Scholar Hub API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scholar Hub API",
        description = "Researcher identity platform backed by the ORCID and CrossRef registries.",
        version = "0.4.1",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    tags(
        (name = "oauth", description = "ORCID OAuth login flow"),
        (name = "identity", description = "Researcher identity lookup"),
        (name = "citations", description = "Citation metrics and analysis"),
        (name = "search", description = "ORCID registry search"),
        (name = "works", description = "Publication listings"),
        (name = "social", description = "Social media accounts"),
        (name = "health", description = "Health and readiness checks"),
    ),
    components(schemas(
        ErrorResponse,
        crate::models::user::SocialAccount,
        crate::services::orcid_client::UserIdentity,
        crate::services::orcid_client::WorkSummary,
        crate::services::citation_service::CitationAnalysis,
        crate::services::citation_service::CitationMetrics,
        crate::services::citation_service::CitationTrend,
        crate::services::citation_service::YearlyCitations,
        crate::services::citation_service::CitedWork,
        crate::services::crossref_client::CitationInfo,
        crate::services::crossref_client::PublicationMetadata,
        crate::services::crossref_client::PublicationAuthor,
    ))
)]
pub struct ApiDoc;

/// Standard error response body returned by all endpoints on failure.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "NOT_FOUND", "VALIDATION_ERROR")
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// Build the OpenAPI document.
pub fn build_openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
