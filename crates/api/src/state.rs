use std::sync::Arc;

use fortyweeks_core::auth::TokenIssuer;
use fortyweeks_core::mail::Mailer;
use fortyweeks_core::media::MediaStore;
use sqlx::SqlitePool;

use crate::config::AppConfig;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    pool: SqlitePool,
    config: AppConfig,
    tokens: TokenIssuer,
    mailer: Mailer,
    media: MediaStore,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig, mailer: Mailer, media: MediaStore) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret);
        Self {
            inner: Arc::new(InnerState {
                pool,
                config,
                tokens,
                mailer,
                media,
            }),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }

    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }
}
