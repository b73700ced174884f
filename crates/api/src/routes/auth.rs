use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use fortyweeks_core::auth::{self, Credentials, Registration};
use fortyweeks_core::store;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/profile", get(profile))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<Registration>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = auth::register(state.pool(), &form).await?;
    let token = state.tokens().issue(&user)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "token": token })),
    ))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> ApiResult<Json<Value>> {
    let user = auth::login(state.pool(), &credentials).await?;
    let token = state.tokens().issue(&user)?;
    tracing::info!(user_id = user.id, "user logged in");
    Ok(Json(json!({ "token": token })))
}

async fn profile(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let account = store::users::get(state.pool(), user.user_id).await?;
    Ok(Json(json!({
        "user_id": account.id,
        "name": account.name,
        "email": account.email,
        "is_admin": account.is_admin,
    })))
}
