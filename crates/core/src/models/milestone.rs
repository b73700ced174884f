use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Persisted checkpoint created with the pregnancy. Maps to `milestones`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Milestone {
    pub id: i64,
    pub pregnancy_id: i64,
    pub milestone_type: String,
    pub title: String,
    pub scheduled_date: NaiveDate,
    pub week_number: i64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
