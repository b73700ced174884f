//! Wiring shared by the binary and the end-to-end tests.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use fortyweeks_core::mail::{
    Composer, EmailDispatcher, LogTransport, MailError, MailTransport, Mailer, SesTransport, Templates,
};
use fortyweeks_core::media::{MediaError, MediaStore};
use fortyweeks_core::store;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;

use crate::config::AppConfig;
use crate::middleware;
use crate::routes;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("failed to prepare media directories: {0}")]
    Media(#[from] MediaError),

    #[error("failed to set up email: {0}")]
    Mail(#[from] MailError),
}

async fn transport(config: &AppConfig) -> Arc<dyn MailTransport> {
    if !config.email_enabled {
        tracing::info!("email disabled, messages will only be logged");
        return Arc::new(LogTransport);
    }
    let ses = SesTransport::new(
        config.ses_credentials(),
        config.mail_settings().from_address(),
        Duration::from_secs(config.email_timeout_secs),
    )
    .await;
    tracing::info!(region = %config.aws_region, "email enabled via SES");
    Arc::new(ses)
}

/// Open the database, apply migrations, and start the email worker.
///
/// The returned handle finishes once every clone of the state is dropped.
pub async fn build_state(config: AppConfig) -> Result<(AppState, JoinHandle<()>), StartupError> {
    let pool = store::connect(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Connected to SQLite");

    store::migrate(&pool).await?;
    tracing::info!("Database migrations applied");

    let media = MediaStore::new(config.images_dir.clone(), config.videos_dir.clone()).await?;

    let composer = Composer::new(Arc::new(Templates::load()?), config.mail_settings());
    let (dispatcher, worker) = EmailDispatcher::spawn(
        pool.clone(),
        transport(&config).await,
        config.email_queue_capacity,
        config.email_max_attempts,
    );
    let mailer = Mailer::new(composer, dispatcher);

    Ok((AppState::new(pool, config, mailer, media), worker))
}

/// Router with request tracing and CORS applied.
pub fn app(state: AppState) -> Router {
    routes::build_router(state).layer(
        ServiceBuilder::new()
            .layer(middleware::request_tracing::trace_layer())
            .layer(middleware::cors::cors_layer()),
    )
}
