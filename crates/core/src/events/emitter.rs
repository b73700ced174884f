use sqlx::SqlitePool;

use super::types::NewEvent;
use crate::models::PregnancyEvent;
use crate::store;

/// Append an event as a side effect of another operation.
///
/// Failures are logged and swallowed: the triggering action has already
/// succeeded and must not be reported as failed because of its event.
pub async fn emit(pool: &SqlitePool, pregnancy_id: i64, event: NewEvent) -> Option<PregnancyEvent> {
    match store::events::insert(pool, pregnancy_id, &event).await {
        Ok(recorded) => {
            tracing::debug!(
                pregnancy_id,
                event_id = recorded.id,
                kind = event.kind.as_str(),
                "recorded timeline event"
            );
            Some(recorded)
        }
        Err(err) => {
            tracing::warn!(
                pregnancy_id,
                kind = event.kind.as_str(),
                error = %err,
                "failed to record timeline event"
            );
            None
        }
    }
}
