use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// Browser clients are served from other origins; tokens travel in the
/// `Authorization` header, so no credentials mode is needed.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
