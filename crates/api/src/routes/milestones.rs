use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use fortyweeks_core::milestones::{self, GeneratedMilestone};
use fortyweeks_core::models::Milestone;
use fortyweeks_core::{progress, store};
use serde::Serialize;

use super::active_pregnancy;
use crate::error::ApiResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/milestones", get(list))
        .route("/api/milestones/scheduled", get(scheduled))
        .route("/api/milestones/{id}/complete", put(complete))
}

#[derive(Serialize)]
struct MilestonesResponse {
    current_week: i64,
    due_date: NaiveDate,
    milestones: Vec<GeneratedMilestone>,
}

async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<MilestonesResponse>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    let current_week = pregnancy.current_week(Utc::now());
    Ok(Json(MilestonesResponse {
        current_week,
        due_date: pregnancy.due_date,
        milestones: milestones::generate(pregnancy.due_date, pregnancy.conception_date, current_week),
    }))
}

async fn scheduled(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Milestone>>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    Ok(Json(store::milestones::list(state.pool(), pregnancy.id).await?))
}

async fn complete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Milestone>> {
    let pregnancy = active_pregnancy(&state, &user).await?;
    let now = Utc::now();
    let milestone = progress::complete_milestone(state.pool(), &pregnancy, id, now).await?;

    match state
        .mailer()
        .notify_milestone(state.pool(), &pregnancy, &milestone, now)
        .await
    {
        Ok(queued) => tracing::debug!(milestone_id = id, queued, "milestone emails queued"),
        Err(err) => tracing::warn!(milestone_id = id, error = %err, "failed to queue milestone emails"),
    }

    Ok(Json(milestone))
}
