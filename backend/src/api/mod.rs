//! HTTP API: router assembly, shared state, middleware wiring.

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod validation;

use axum::http::{HeaderValue, Method};
use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::error::Result;
use crate::services::citation_service::CitationService;
use crate::services::crossref_client::CrossrefClient;
use crate::services::metrics_service::MetricsService;
use crate::services::oauth_service::OAuthService;
use crate::services::orcid_client::OrcidClient;
use crate::services::profile_sync_service::ProfileSyncService;

/// Application state shared across handlers.
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub orcid: OrcidClient,
    pub crossref: CrossrefClient,
    pub oauth: OAuthService,
    pub citations: CitationService,
    pub metrics: MetricsService,
    pub sync: ProfileSyncService,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Result<Self> {
        let orcid = OrcidClient::new(config.orcid_api_base())?;
        let crossref = CrossrefClient::new(&config.crossref_user_agent)?;
        let oauth = OAuthService::new(&config);
        let citations = CitationService::new(orcid.clone(), crossref.clone());
        let metrics = MetricsService::new(db.clone());
        let sync = ProfileSyncService::new(db.clone(), orcid.clone(), citations.clone());
        Ok(Self {
            db,
            config,
            orcid,
            crossref,
            oauth,
            citations,
            metrics,
            sync,
        })
    }
}

/// Build the full application router.
pub fn router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .nest("/oauth", handlers::oauth::router())
        .nest(
            "/api",
            Router::new()
                .merge(handlers::health::router())
                .merge(handlers::identity::router())
                .merge(handlers::profile::router())
                .merge(handlers::citations::router())
                .merge(handlers::search::router())
                .merge(handlers::works::router())
                .merge(handlers::social::router()),
        )
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::build_openapi()),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::demo::demo_guard,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::load_session,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE];
    if config.cors_allowed_origins.trim() == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .split(',')
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(methods)
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::AUTHORIZATION,
            ])
            .allow_credentials(true)
    }
}
