use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::events::EventKind;

/// Immutable timeline entry. Maps to `pregnancy_events`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PregnancyEvent {
    pub id: i64,
    pub pregnancy_id: i64,
    pub event_type: EventKind,
    pub title: String,
    pub description: Option<String>,
    pub event_data: Option<Json<Value>>,
    pub week_number: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}
