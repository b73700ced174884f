use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use fortyweeks_core::access::{self, Decision};
use fortyweeks_core::models::{AccessRequest, NewAccessRequest};
use fortyweeks_core::store;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{active_pregnancy, shared_pregnancy};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/timeline/{share_id}/verify-access", post(verify_access))
        .route("/api/timeline/{share_id}/request-access", post(request_access))
        .route("/api/village-members/access-requests", get(pending))
        .route(
            "/api/village-members/access-requests/{id}/{action}",
            post(resolve),
        )
}

#[derive(Deserialize)]
struct VerifyAccess {
    #[serde(default)]
    email: String,
}

async fn verify_access(
    State(state): State<AppState>,
    Path(share_id): Path<String>,
    ApiJson(body): ApiJson<VerifyAccess>,
) -> ApiResult<Json<Value>> {
    let pregnancy = shared_pregnancy(&state, &share_id).await?;
    let has_access = access::verify(state.pool(), &pregnancy, &body.email).await?;
    Ok(Json(json!({ "has_access": has_access })))
}

async fn request_access(
    State(state): State<AppState>,
    Path(share_id): Path<String>,
    ApiJson(new): ApiJson<NewAccessRequest>,
) -> ApiResult<Json<Value>> {
    let pregnancy = shared_pregnancy(&state, &share_id).await?;
    let request = access::submit(state.pool(), &pregnancy, &new).await?;
    tracing::info!(pregnancy_id = pregnancy.id, request_id = request.id, "access requested");

    if let Err(err) = state
        .mailer()
        .notify_access_request(state.pool(), &pregnancy, &request, Utc::now())
        .await
    {
        tracing::warn!(request_id = request.id, error = %err, "failed to queue access request email");
    }

    Ok(Json(json!({ "status": "success" })))
}

async fn pending(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<AccessRequest>>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    Ok(Json(store::access_requests::list_pending(state.pool(), pregnancy.id).await?))
}

async fn resolve(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, action)): Path<(i64, String)>,
) -> ApiResult<Json<Value>> {
    let decision: Decision = action.parse().map_err(fortyweeks_core::CoreError::from)?;
    let now = Utc::now();
    let resolution = access::resolve(state.pool(), user.user_id, id, decision, now).await?;

    if let Some(member) = &resolution.member {
        if let Err(err) = state
            .mailer()
            .welcome(state.pool(), &resolution.pregnancy, member, now)
            .await
        {
            tracing::warn!(member_id = member.id, error = %err, "failed to queue welcome email");
        }
    }

    let done = match decision {
        Decision::Approve => "approved",
        Decision::Deny => "denied",
    };
    Ok(Json(json!({
        "status": "success",
        "action": decision.as_str(),
        "message": format!("Request {done} successfully"),
    })))
}
