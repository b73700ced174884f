use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use fortyweeks_core::models::{EmailNotification, NotificationSummary};
use fortyweeks_core::{store, updates, CoreError};
use serde::Deserialize;
use serde_json::{json, Value};

use super::active_pregnancy;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::auth::{AdminUser, AuthUser};
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/email/test", post(send_test))
        .route("/api/email/config-test", get(config_test))
        .route("/api/email/notifications", get(notifications))
        .route("/api/email/stats", get(stats))
        .route("/api/email/send-update", post(send_update))
}

type Outcome = (StatusCode, Json<Value>);

fn outcome(ok: bool, message: String) -> Outcome {
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({ "success": ok, "message": message })))
}

#[derive(Deserialize)]
struct TestEmail {
    #[serde(default)]
    to_email: String,
    to_name: Option<String>,
}

async fn send_test(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(body): ApiJson<TestEmail>,
) -> ApiResult<Outcome> {
    let to_email = body.to_email.trim();
    if to_email.is_empty() {
        return Err(ApiError::BadRequest("to_email is required".to_string()));
    }
    let to_name = body
        .to_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Test User");

    tracing::info!(admin_id = admin.user_id, to = %to_email, "sending test email");
    Ok(match state.mailer().send_test(to_email, to_name, Utc::now()).await {
        Ok(_) => outcome(true, format!("Test email sent successfully to {to_email}")),
        Err(err) => outcome(false, format!("Failed to send test email: {err}")),
    })
}

async fn config_test(State(state): State<AppState>, _admin: AdminUser) -> Outcome {
    match state.mailer().check_config().await {
        Ok(()) => outcome(true, "Email configuration is working correctly".to_string()),
        Err(err) => outcome(false, format!("Email configuration test failed: {err}")),
    }
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<String>,
}

impl HistoryQuery {
    fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .map_or(DEFAULT_HISTORY_LIMIT, |l| l.min(MAX_HISTORY_LIMIT))
    }
}

async fn notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<EmailNotification>>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    let rows =
        store::notifications::list_for_pregnancy(state.pool(), pregnancy.id, query.limit()).await?;
    Ok(Json(rows))
}

async fn stats(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<NotificationSummary>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    Ok(Json(store::notifications::summary(state.pool(), pregnancy.id).await?))
}

#[derive(Deserialize)]
struct SendUpdate {
    #[serde(default)]
    update_id: i64,
}

async fn send_update(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<SendUpdate>,
) -> ApiResult<Json<Value>> {
    if body.update_id <= 0 {
        return Err(ApiError::BadRequest("update_id is required".to_string()));
    }
    let pregnancy = active_pregnancy(&state, &user).await?;
    let update = updates::owned(state.pool(), &pregnancy, body.update_id)
        .await
        .map_err(|err| match err {
            CoreError::NotFound(_) | CoreError::Forbidden(_) => {
                ApiError::NotFound("Update not found or access denied".to_string())
            }
            other => other.into(),
        })?;

    let queued = state
        .mailer()
        .notify_update(state.pool(), &pregnancy, &update, Utc::now())
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Update notification sent successfully",
        "queued": queued,
    })))
}
