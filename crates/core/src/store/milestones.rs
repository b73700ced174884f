use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{CoreError, CoreResult};
use crate::milestones::NewMilestone;
use crate::models::Milestone;

pub async fn insert_many(
    conn: &mut SqliteConnection,
    pregnancy_id: i64,
    rows: &[NewMilestone],
) -> CoreResult<()> {
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO milestones (pregnancy_id, milestone_type, title, scheduled_date, week_number)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(pregnancy_id)
        .bind(row.milestone_type)
        .bind(row.title)
        .bind(row.scheduled_date)
        .bind(row.week_number)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn list(pool: &SqlitePool, pregnancy_id: i64) -> CoreResult<Vec<Milestone>> {
    let rows = sqlx::query_as::<_, Milestone>(
        "SELECT * FROM milestones WHERE pregnancy_id = ? ORDER BY scheduled_date ASC, id ASC",
    )
    .bind(pregnancy_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find(pool: &SqlitePool, id: i64) -> CoreResult<Option<Milestone>> {
    let row = sqlx::query_as::<_, Milestone>("SELECT * FROM milestones WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Mark a milestone complete. Completing twice is a conflict.
pub async fn complete(pool: &SqlitePool, id: i64) -> CoreResult<Milestone> {
    let row = sqlx::query_as::<_, Milestone>(
        r#"
        UPDATE milestones SET is_completed = TRUE, completed_at = ?
        WHERE id = ? AND is_completed = FALSE
        RETURNING *
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.ok_or_else(|| CoreError::Conflict("milestone already completed".into()))
}
