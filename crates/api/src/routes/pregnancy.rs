use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use fortyweeks_core::events::JoinSource;
use fortyweeks_core::models::PregnancyView;
use fortyweeks_core::pregnancy::{self, InviteInfo, PregnancyEditForm, PregnancyForm};
use fortyweeks_core::village::{self, BulkMembers, BulkOutcome};
use fortyweeks_core::{invite, store};
use serde_json::{json, Value};

use super::active_pregnancy;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

const COVER_FIELD: &str = "cover_photo";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/pregnancy",
            get(current).post(create).put(edit),
        )
        .route("/api/pregnancy/current", get(current))
        .route("/api/pregnancy/invite-hash", get(invite_hash))
        .route("/api/pregnancy/invite/{hash}", get(invite_details))
        .route("/api/pregnancy/join/{hash}", post(join))
        .route(
            "/api/pregnancy/cover-photo",
            post(upload_cover).delete(delete_cover),
        )
}

async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(form): ApiJson<PregnancyForm>,
) -> ApiResult<(StatusCode, Json<PregnancyView>)> {
    let now = Utc::now();
    let created = pregnancy::create(state.pool(), user.user_id, &form, now).await?;
    Ok((StatusCode::CREATED, Json(created.view(now))))
}

async fn current(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<PregnancyView>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    Ok(Json(pregnancy.view(Utc::now())))
}

async fn edit(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(form): ApiJson<PregnancyEditForm>,
) -> ApiResult<Json<PregnancyView>> {
    let updated = pregnancy::edit(state.pool(), user.user_id, &form).await?;
    Ok(Json(updated.view(Utc::now())))
}

async fn invite_hash(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    let hash = invite::encode(pregnancy.id).map_err(|e| ApiError::Internal(e.to_string()))?;
    let base = state.config().base_url.trim_end_matches('/');
    Ok(Json(json!({
        "invite_hash": hash,
        "invite_url": format!("{base}/join/{hash}"),
    })))
}

async fn invite_details(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> ApiResult<Json<InviteInfo>> {
    let pregnancy = pregnancy::from_invite(state.pool(), &hash).await?;
    Ok(Json(pregnancy::invite_info(state.pool(), &pregnancy).await?))
}

async fn join(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    ApiJson(bulk): ApiJson<BulkMembers>,
) -> ApiResult<(StatusCode, Json<BulkOutcome>)> {
    let pregnancy = pregnancy::from_invite(state.pool(), &hash).await?;
    let outcome =
        village::add_members(state.pool(), &pregnancy, &bulk, JoinSource::Invite, Utc::now()).await?;
    tracing::info!(
        pregnancy_id = pregnancy.id,
        created = outcome.created.len(),
        skipped = outcome.skipped.len(),
        "joined village from invite"
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn upload_cover(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let pregnancy = active_pregnancy(&state, &user).await?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(COVER_FIELD) {
            continue;
        }
        let original = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;

        let stored = state
            .media()
            .save_cover(pregnancy.id, &original, &data, Utc::now())
            .await?;
        let updated =
            store::pregnancies::set_cover_photo(state.pool(), pregnancy.id, Some(&stored.filename))
                .await?;
        if let Some(previous) = pregnancy.cover_photo_filename.as_deref() {
            if previous != stored.filename {
                state.media().remove_cover(previous).await;
            }
        }

        tracing::info!(pregnancy_id = pregnancy.id, filename = %stored.filename, "cover photo replaced");
        return Ok(Json(json!({
            "success": true,
            "filename": stored.filename,
            "cover_photo_url": updated.cover_photo_path(),
        })));
    }

    Err(ApiError::BadRequest(format!(
        "Missing '{COVER_FIELD}' field in multipart form"
    )))
}

async fn delete_cover(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    if let Some(filename) = pregnancy.cover_photo_filename.as_deref() {
        state.media().remove_cover(filename).await;
    }
    store::pregnancies::set_cover_photo(state.pool(), pregnancy.id, None).await?;
    Ok(Json(json!({ "success": true })))
}
