use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use fortyweeks_core::media::MediaRoot;

use crate::error::ApiResult;
use crate::state::AppState;

/// Uploaded files never change once written.
const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/images/{*path}", get(image))
        .route("/videos/{*path}", get(video))
}

async fn serve(state: &AppState, root: MediaRoot, path: &str) -> ApiResult<impl IntoResponse> {
    let (data, content_type) = state.media().read(root, path).await?;
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, CACHE_CONTROL),
        ],
        data,
    ))
}

async fn image(State(state): State<AppState>, Path(path): Path<String>) -> ApiResult<impl IntoResponse> {
    serve(&state, MediaRoot::Images, &path).await
}

async fn video(State(state): State<AppState>, Path(path): Path<String>) -> ApiResult<impl IntoResponse> {
    serve(&state, MediaRoot::Videos, &path).await
}
