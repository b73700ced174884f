use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use fortyweeks_core::media;
use fortyweeks_core::models::{MediaKind, NewUpdate, Pregnancy, PregnancyUpdate, UpdateChanges};
use fortyweeks_core::store;
use fortyweeks_core::updates::{self, Upload};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::active_pregnancy;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/updates", get(list).post(create))
        .route("/api/updates/{id}", put(edit).delete(remove))
        .route("/api/updates/{id}/share", put(set_shared))
}

/// Update fields plus any attached files.
///
/// Accepts either a JSON body or `multipart/form-data` where the `data`
/// field holds the JSON and files arrive as `photos` and `videos`. Photos
/// are ordered before videos.
pub struct UpdateForm<T> {
    pub fields: T,
    pub uploads: Vec<Upload>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

impl<T> FromRequest<AppState> for UpdateForm<T>
where
    T: DeserializeOwned + Default + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let ApiJson(fields) = ApiJson::<T>::from_request(req, state).await?;
            return Ok(Self {
                fields,
                uploads: Vec::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let mut fields = None;
        let mut photos = Vec::new();
        let mut videos = Vec::new();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            let kind = match name.as_deref() {
                Some("data") => {
                    let text = field.text().await?;
                    let parsed = serde_json::from_str(&text)
                        .map_err(|e| ApiError::BadRequest(format!("Invalid data field: {e}")))?;
                    fields = Some(parsed);
                    continue;
                }
                Some("photos") => MediaKind::Image,
                Some("videos") => MediaKind::Video,
                _ => continue,
            };

            let original_filename = field.file_name().unwrap_or_default().to_string();
            if original_filename.is_empty() {
                continue;
            }
            media::check_upload(kind, &original_filename)?;
            let data = field.bytes().await?;
            if data.is_empty() {
                continue;
            }
            let upload = Upload {
                kind,
                original_filename,
                data: data.to_vec(),
            };
            match kind {
                MediaKind::Image => photos.push(upload),
                MediaKind::Video => videos.push(upload),
            }
        }

        photos.extend(videos);
        Ok(Self {
            fields: fields.unwrap_or_default(),
            uploads: photos,
        })
    }
}

async fn announce(state: &AppState, pregnancy: &Pregnancy, update: &PregnancyUpdate, now: DateTime<Utc>) {
    match state
        .mailer()
        .notify_update(state.pool(), pregnancy, update, now)
        .await
    {
        Ok(queued) => tracing::debug!(update_id = update.id, queued, "update emails queued"),
        Err(err) => tracing::warn!(update_id = update.id, error = %err, "failed to queue update emails"),
    }
}

async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<PregnancyUpdate>>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    Ok(Json(store::updates::list_for_pregnancy(state.pool(), pregnancy.id).await?))
}

async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    form: UpdateForm<NewUpdate>,
) -> ApiResult<(StatusCode, Json<PregnancyUpdate>)> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    let owner = store::users::get(state.pool(), user.user_id).await?;
    let now = Utc::now();

    let update = updates::create(state.pool(), &owner, &pregnancy, &form.fields, now).await?;
    let update = updates::attach(state.pool(), state.media(), &update, &form.uploads, now).await?;

    if update.is_shared {
        announce(&state, &pregnancy, &update, now).await;
    }
    Ok((StatusCode::CREATED, Json(update)))
}

async fn edit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    form: UpdateForm<UpdateChanges>,
) -> ApiResult<Json<PregnancyUpdate>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    let owner = store::users::get(state.pool(), user.user_id).await?;
    let now = Utc::now();

    let (update, newly_shared) = updates::edit(state.pool(), &owner, &pregnancy, id, &form.fields).await?;
    let update = updates::attach(state.pool(), state.media(), &update, &form.uploads, now).await?;

    if newly_shared {
        announce(&state, &pregnancy, &update, now).await;
    }
    Ok(Json(update))
}

#[derive(Deserialize)]
struct ShareToggle {
    is_shared: bool,
}

async fn set_shared(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(toggle): ApiJson<ShareToggle>,
) -> ApiResult<Json<Value>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    let owner = store::users::get(state.pool(), user.user_id).await?;
    let changes = UpdateChanges {
        is_shared: Some(toggle.is_shared),
        ..Default::default()
    };

    let (update, newly_shared) = updates::edit(state.pool(), &owner, &pregnancy, id, &changes).await?;
    if newly_shared {
        let update = store::updates::with_photos(state.pool(), update).await?;
        announce(&state, &pregnancy, &update, Utc::now()).await;
    }
    Ok(Json(json!({ "success": true, "is_shared": toggle.is_shared })))
}

async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    updates::remove(state.pool(), state.media(), &pregnancy, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
