use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Account that owns pregnancies. Maps to the `users` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// First word of the display name.
    pub fn first_name(&self) -> &str {
        first_name(&self.name)
    }
}

pub fn first_name(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or(name)
}
