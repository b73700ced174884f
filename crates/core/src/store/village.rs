use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::{CoreError, CoreResult};
use crate::models::VillageMember;

pub const DUPLICATE_MEMBER: &str = "a village member with this email already exists";

/// Fields of a member row about to be inserted; strings already normalized.
#[derive(Debug, Clone)]
pub struct MemberRow<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub relationship: &'a str,
    pub is_told: bool,
}

pub async fn insert<'e, E>(executor: E, pregnancy_id: i64, row: &MemberRow<'_>) -> CoreResult<VillageMember>
where
    E: SqliteExecutor<'e>,
{
    let now = Utc::now();
    let told_date = row.is_told.then_some(now);
    let token = uuid::Uuid::new_v4().simple().to_string();

    sqlx::query_as::<_, VillageMember>(
        r#"
        INSERT INTO village_members
            (pregnancy_id, name, email, relationship, is_told, told_date,
             is_subscribed, unsubscribe_token, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, TRUE, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(pregnancy_id)
    .bind(row.name)
    .bind(row.email)
    .bind(row.relationship)
    .bind(row.is_told)
    .bind(told_date)
    .bind(token)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| CoreError::conflict_on_unique(e, DUPLICATE_MEMBER))
}

pub async fn exists_with_email(pool: &SqlitePool, pregnancy_id: i64, email: &str) -> CoreResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM village_members WHERE pregnancy_id = ? AND LOWER(email) = LOWER(?) LIMIT 1",
    )
    .bind(pregnancy_id)
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

pub async fn list(pool: &SqlitePool, pregnancy_id: i64) -> CoreResult<Vec<VillageMember>> {
    let members = sqlx::query_as::<_, VillageMember>(
        "SELECT * FROM village_members WHERE pregnancy_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(pregnancy_id)
    .fetch_all(pool)
    .await?;
    Ok(members)
}

/// Members who still want email.
pub async fn list_subscribed(pool: &SqlitePool, pregnancy_id: i64) -> CoreResult<Vec<VillageMember>> {
    let members = sqlx::query_as::<_, VillageMember>(
        r#"
        SELECT * FROM village_members
        WHERE pregnancy_id = ? AND is_subscribed = TRUE AND email != ''
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(pregnancy_id)
    .fetch_all(pool)
    .await?;
    Ok(members)
}

pub async fn find(pool: &SqlitePool, id: i64) -> CoreResult<Option<VillageMember>> {
    let member = sqlx::query_as::<_, VillageMember>("SELECT * FROM village_members WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(member)
}

pub async fn set_told(
    pool: &SqlitePool,
    id: i64,
    is_told: bool,
    told_date: Option<DateTime<Utc>>,
) -> CoreResult<VillageMember> {
    let member = sqlx::query_as::<_, VillageMember>(
        r#"
        UPDATE village_members SET is_told = ?, told_date = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(is_told)
    .bind(told_date)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?;
    member.ok_or_else(|| CoreError::NotFound("village member not found".into()))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> CoreResult<bool> {
    let result = sqlx::query("DELETE FROM village_members WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Turn off email for the member holding `token`.
pub async fn unsubscribe(pool: &SqlitePool, token: &str) -> CoreResult<Option<VillageMember>> {
    let member = sqlx::query_as::<_, VillageMember>(
        r#"
        UPDATE village_members SET is_subscribed = FALSE, updated_at = ?
        WHERE unsubscribe_token = ?
        RETURNING *
        "#,
    )
    .bind(Utc::now())
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(member)
}
