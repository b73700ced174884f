use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::CoreResult;
use crate::models::{AccessRequest, AccessRequestStatus};

pub async fn insert(
    pool: &SqlitePool,
    pregnancy_id: i64,
    email: &str,
    name: &str,
    relationship: &str,
    message: Option<&str>,
) -> CoreResult<AccessRequest> {
    let now = Utc::now();
    let request = sqlx::query_as::<_, AccessRequest>(
        r#"
        INSERT INTO access_requests
            (pregnancy_id, email, name, relationship, message, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)
        RETURNING *
        "#,
    )
    .bind(pregnancy_id)
    .bind(email)
    .bind(name)
    .bind(relationship)
    .bind(message)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(request)
}

pub async fn has_pending(pool: &SqlitePool, pregnancy_id: i64, email: &str) -> CoreResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM access_requests
        WHERE pregnancy_id = ? AND LOWER(email) = LOWER(?) AND status = 'pending'
        LIMIT 1
        "#,
    )
    .bind(pregnancy_id)
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

pub async fn list_pending(pool: &SqlitePool, pregnancy_id: i64) -> CoreResult<Vec<AccessRequest>> {
    let requests = sqlx::query_as::<_, AccessRequest>(
        r#"
        SELECT * FROM access_requests
        WHERE pregnancy_id = ? AND status = 'pending'
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(pregnancy_id)
    .fetch_all(pool)
    .await?;
    Ok(requests)
}

pub async fn find_pending(pool: &SqlitePool, id: i64) -> CoreResult<Option<AccessRequest>> {
    let request = sqlx::query_as::<_, AccessRequest>(
        "SELECT * FROM access_requests WHERE id = ? AND status = 'pending'",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(request)
}

/// Move a pending request to a final status. Returns false if it was no longer pending.
pub async fn resolve<'e, E>(executor: E, id: i64, status: AccessRequestStatus) -> CoreResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE access_requests SET status = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(status)
    .bind(Utc::now())
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> CoreResult<()> {
    sqlx::query("DELETE FROM access_requests WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
