//! Completing the milestones persisted with a pregnancy.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{CoreError, CoreResult};
use crate::events::{self, NewEvent};
use crate::models::{Milestone, Pregnancy};
use crate::store;

/// Mark one of `pregnancy`'s milestones done and record `milestone_reached`.
#[tracing::instrument(name = "milestones.complete", skip(pool, pregnancy), fields(pregnancy_id = pregnancy.id))]
pub async fn complete_milestone(
    pool: &SqlitePool,
    pregnancy: &Pregnancy,
    milestone_id: i64,
    now: DateTime<Utc>,
) -> CoreResult<Milestone> {
    let milestone = store::milestones::find(pool, milestone_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("milestone not found".into()))?;
    if milestone.pregnancy_id != pregnancy.id {
        return Err(CoreError::Forbidden("milestone belongs to another pregnancy".into()));
    }

    let done = store::milestones::complete(pool, milestone.id).await?;
    events::emit(
        pool,
        pregnancy.id,
        NewEvent::milestone_reached(&done.title, done.week_number, pregnancy.user_id),
    )
    .await;
    tracing::info!(milestone_id, week = done.week_number, "milestone completed");
    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::store::testing;

    #[tokio::test]
    async fn completion_records_event_once() {
        let pool = testing::pool().await;
        let (_, pregnancy) = testing::user_with_pregnancy(&pool, "a@x.com").await;
        let scan = store::milestones::list(&pool, pregnancy.id).await.unwrap().remove(1);

        let done = complete_milestone(&pool, &pregnancy, scan.id, Utc::now()).await.unwrap();
        assert!(done.is_completed);
        assert!(matches!(
            complete_milestone(&pool, &pregnancy, scan.id, Utc::now()).await,
            Err(CoreError::Conflict(_))
        ));

        let events = store::events::list_for_pregnancy(&pool, pregnancy.id).await.unwrap();
        let reached: Vec<_> = events
            .iter()
            .filter(|e| e.event_type == EventKind::MilestoneReached)
            .collect();
        assert_eq!(reached.len(), 1);
        assert_eq!(reached[0].week_number, Some(done.week_number));
    }

    #[tokio::test]
    async fn other_pregnancies_milestones_are_forbidden() {
        let pool = testing::pool().await;
        let (_, mine) = testing::user_with_pregnancy(&pool, "a@x.com").await;
        let (_, theirs) = testing::user_with_pregnancy(&pool, "b@x.com").await;
        let theirs_first = store::milestones::list(&pool, theirs.id).await.unwrap().remove(0);

        assert!(matches!(
            complete_milestone(&pool, &mine, theirs_first.id, Utc::now()).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            complete_milestone(&pool, &mine, 9_999, Utc::now()).await,
            Err(CoreError::NotFound(_))
        ));
    }
}
