use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Someone following a pregnancy. Maps to `village_members`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VillageMember {
    pub id: i64,
    pub pregnancy_id: i64,
    pub name: String,
    pub email: String,
    pub relationship: String,
    pub is_told: bool,
    pub told_date: Option<DateTime<Utc>>,
    pub is_subscribed: bool,
    #[serde(skip_serializing)]
    pub unsubscribe_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVillageMember {
    pub name: String,
    pub email: String,
    pub relationship: String,
    #[serde(default)]
    pub is_told: bool,
}
