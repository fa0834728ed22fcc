//! Health and readiness checks.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::api::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new().route("/health", get(health))
}

/// GET /api/health
///
/// Reports overall status plus a database probe. Returns 200 even when the
/// database is down so load balancers can distinguish "process up" from
/// "fully ready" by reading the body.
pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    let db_status = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "health probe: database unreachable");
            "unavailable"
        }
    };

    Json(json!({
        "status": if db_status == "ok" { "healthy" } else { "degraded" },
        "database": db_status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
