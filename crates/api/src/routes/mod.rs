pub mod access;
pub mod auth;
pub mod email;
pub mod health;
pub mod media;
pub mod milestones;
pub mod pregnancy;
pub mod share;
pub mod timeline;
pub mod updates;
pub mod village;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use fortyweeks_core::models::Pregnancy;
use fortyweeks_core::store;

use crate::error::ApiResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config().max_upload_bytes;
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(pregnancy::routes())
        .merge(milestones::routes())
        .merge(village::routes())
        .merge(access::routes())
        .merge(updates::routes())
        .merge(timeline::routes())
        .merge(share::routes())
        .merge(email::routes())
        .merge(media::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// The signed-in user's active pregnancy, or 404.
pub(crate) async fn active_pregnancy(state: &AppState, user: &AuthUser) -> ApiResult<Pregnancy> {
    Ok(store::pregnancies::active_for_user(state.pool(), user.user_id).await?)
}

/// Pregnancy behind a public share id, or 404.
pub(crate) async fn shared_pregnancy(state: &AppState, share_id: &str) -> ApiResult<Pregnancy> {
    store::pregnancies::find_by_share_id(state.pool(), share_id)
        .await?
        .ok_or_else(|| crate::error::ApiError::NotFound("Timeline not found".to_string()))
}
