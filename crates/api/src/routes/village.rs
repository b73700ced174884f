use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use fortyweeks_core::events::JoinSource;
use fortyweeks_core::models::{NewVillageMember, VillageMember};
use fortyweeks_core::store;
use fortyweeks_core::village::{self, BulkMembers, BulkOutcome};
use serde::Deserialize;
use serde_json::{json, Value};

use super::active_pregnancy;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/village-members", get(list).post(create))
        .route("/api/village-members/bulk", post(create_bulk))
        .route("/api/village-members/{id}", put(set_told).delete(remove))
        .route("/api/unsubscribe/{token}", get(unsubscribe))
}

async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<VillageMember>>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    Ok(Json(store::village::list(state.pool(), pregnancy.id).await?))
}

async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(new): ApiJson<NewVillageMember>,
) -> ApiResult<(StatusCode, Json<VillageMember>)> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    let member =
        village::add_member(state.pool(), &pregnancy, &new, JoinSource::Manual, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn create_bulk(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(bulk): ApiJson<BulkMembers>,
) -> ApiResult<(StatusCode, Json<BulkOutcome>)> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    let outcome =
        village::add_members(state.pool(), &pregnancy, &bulk, JoinSource::Manual, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[derive(Deserialize)]
struct ToldChange {
    is_told: bool,
}

async fn set_told(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(change): ApiJson<ToldChange>,
) -> ApiResult<Json<VillageMember>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    let member = village::set_told(state.pool(), &pregnancy, id, change.is_told, Utc::now()).await?;
    Ok(Json(member))
}

async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    village::remove(state.pool(), &pregnancy, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unsubscribe(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<Value>> {
    let member = store::village::unsubscribe(state.pool(), &token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Unsubscribe link is invalid".to_string()))?;
    tracing::info!(member_id = member.id, "village member unsubscribed");
    Ok(Json(json!({
        "success": true,
        "message": format!("{} will no longer receive update emails", member.email),
    })))
}
