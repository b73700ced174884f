use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/ping", get(ping))
}

/// Reports 503 when SQLite does not answer; email is informational only.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => "connected",
        Err(err) => {
            tracing::error!(error = %err, "database health check failed");
            "unreachable"
        }
    };
    let (status, label) = if database == "connected" {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status,
        Json(json!({
            "status": label,
            "database": database,
            "email": state.mailer().transport_name(),
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
