use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::error::CoreResult;
use crate::events::NewEvent;
use crate::models::PregnancyEvent;

/// Append one event. Events are never updated or deleted.
pub async fn insert(pool: &SqlitePool, pregnancy_id: i64, event: &NewEvent) -> CoreResult<PregnancyEvent> {
    let recorded = sqlx::query_as::<_, PregnancyEvent>(
        r#"
        INSERT INTO pregnancy_events
            (pregnancy_id, event_type, title, description, event_data, week_number, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(pregnancy_id)
    .bind(event.kind)
    .bind(&event.title)
    .bind(&event.description)
    .bind(event.data.as_ref().map(Json))
    .bind(event.week_number)
    .bind(event.created_by)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(recorded)
}

pub async fn list_for_pregnancy(pool: &SqlitePool, pregnancy_id: i64) -> CoreResult<Vec<PregnancyEvent>> {
    let events = sqlx::query_as::<_, PregnancyEvent>(
        "SELECT * FROM pregnancy_events WHERE pregnancy_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(pregnancy_id)
    .fetch_all(pool)
    .await?;
    Ok(events)
}
