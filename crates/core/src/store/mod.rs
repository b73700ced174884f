//! SQLite repositories.
//!
//! Each submodule owns the SQL for one table. Functions take the pool (or a
//! connection, when they must join a caller's transaction) explicitly.

pub mod access_requests;
pub mod events;
pub mod milestones;
pub mod notifications;
pub mod pregnancies;
pub mod updates;
pub mod users;
pub mod village;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Open the database.
///
/// Accepts `sqlite:` URLs (including `sqlite::memory:`) or a plain file
/// path, whose parent directory is created if missing. In-memory databases
/// are pinned to a single long-lived connection so every query sees the
/// same data.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = database_url.contains(":memory:");

    let options = if database_url.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(database_url)?
    } else {
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        SqliteConnectOptions::new().filename(database_url)
    };

    let options = options
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(if in_memory {
            SqliteJournalMode::Memory
        } else {
            SqliteJournalMode::Wal
        });

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections)
    };

    pool_options.connect_with(options).await
}

/// Apply the embedded migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
