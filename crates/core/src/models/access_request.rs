use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AccessRequestStatus {
    Pending,
    Approved,
    Denied,
}

/// A stranger asking to see a shared timeline. Maps to `access_requests`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AccessRequest {
    pub id: i64,
    pub pregnancy_id: i64,
    pub email: String,
    pub name: String,
    pub relationship: String,
    pub message: Option<String>,
    pub status: AccessRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAccessRequest {
    pub email: String,
    pub name: String,
    pub relationship: String,
    pub message: Option<String>,
}
