use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use fortyweeks_core::timeline::{self, PageQuery, SharedPage, TimelinePage};
use fortyweeks_core::{access, store};
use serde::{Deserialize, Serialize};

use super::{active_pregnancy, shared_pregnancy};
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/timeline", get(private_timeline))
        .route("/timeline/{share_id}", get(public_timeline))
}

async fn private_timeline(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<TimelinePage>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    Ok(Json(timeline::page(state.pool(), pregnancy.id, query.page()).await?))
}

#[derive(Deserialize)]
struct Viewer {
    email: Option<String>,
}

#[derive(Serialize)]
struct PublicPregnancy {
    parent_names: String,
    baby_name: String,
    due_date: String,
    current_week: i64,
}

#[derive(Serialize)]
struct PublicTimeline {
    #[serde(flatten)]
    page: SharedPage,
    pregnancy: PublicPregnancy,
}

/// One page of shared updates for a viewer whose email is on the access list.
async fn public_timeline(
    State(state): State<AppState>,
    Path(share_id): Path<String>,
    Query(viewer): Query<Viewer>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PublicTimeline>> {
    let email = viewer
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::BadRequest("email is required".to_string()))?;

    let pregnancy = shared_pregnancy(&state, &share_id).await?;
    if !access::verify(state.pool(), &pregnancy, email).await? {
        return Err(ApiError::Forbidden(
            "This email does not have access to this timeline".to_string(),
        ));
    }

    let owner = store::users::get(state.pool(), pregnancy.user_id).await?;
    let page = timeline::shared_updates(state.pool(), pregnancy.id, query.page()).await?;
    Ok(Json(PublicTimeline {
        page,
        pregnancy: PublicPregnancy {
            parent_names: pregnancy.parent_first_names(&owner.name),
            baby_name: pregnancy.baby_name().to_string(),
            due_date: pregnancy.due_date.format("%Y-%m-%d").to_string(),
            current_week: pregnancy.current_week(Utc::now()),
        },
    }))
}
