use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{CoreError, CoreResult};
use crate::milestones;
use crate::models::{NewPregnancy, Pregnancy, PregnancyChanges};
use crate::store;

const ACTIVE_CONFLICT: &str = "an active pregnancy already exists for this user";

/// Insert a pregnancy and its default milestones in one transaction.
#[tracing::instrument(name = "store.pregnancies.create", skip(pool, new))]
pub async fn create_with_milestones(
    pool: &SqlitePool,
    user_id: i64,
    new: &NewPregnancy,
    share_id: &str,
) -> CoreResult<Pregnancy> {
    let mut tx = pool.begin().await?;

    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM pregnancies WHERE user_id = ? AND is_active = TRUE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
    if existing.is_some() {
        return Err(CoreError::Conflict(ACTIVE_CONFLICT.into()));
    }

    let now = Utc::now();
    let pregnancy = sqlx::query_as::<_, Pregnancy>(
        r#"
        INSERT INTO pregnancies
            (user_id, partner_name, partner_email, due_date, conception_date,
             baby_name, is_active, share_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, TRUE, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&new.partner_name)
    .bind(&new.partner_email)
    .bind(new.due_date)
    .bind(new.conception_date)
    .bind(&new.baby_name)
    .bind(share_id)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| CoreError::conflict_on_unique(e, ACTIVE_CONFLICT))?;

    store::milestones::insert_many(
        &mut *tx,
        pregnancy.id,
        &milestones::default_milestones(pregnancy.due_date),
    )
    .await?;

    tx.commit().await?;
    Ok(pregnancy)
}

pub async fn find_active_for_user(pool: &SqlitePool, user_id: i64) -> CoreResult<Option<Pregnancy>> {
    let pregnancy = sqlx::query_as::<_, Pregnancy>(
        "SELECT * FROM pregnancies WHERE user_id = ? AND is_active = TRUE ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(pregnancy)
}

/// The user's active pregnancy; a missing one is `NotFound`.
pub async fn active_for_user(pool: &SqlitePool, user_id: i64) -> CoreResult<Pregnancy> {
    find_active_for_user(pool, user_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("no active pregnancy found".into()))
}

pub async fn find_active_by_id(pool: &SqlitePool, id: i64) -> CoreResult<Option<Pregnancy>> {
    let pregnancy = sqlx::query_as::<_, Pregnancy>(
        "SELECT * FROM pregnancies WHERE id = ? AND is_active = TRUE",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(pregnancy)
}

pub async fn find_by_share_id(pool: &SqlitePool, share_id: &str) -> CoreResult<Option<Pregnancy>> {
    let pregnancy = sqlx::query_as::<_, Pregnancy>(
        "SELECT * FROM pregnancies WHERE share_id = ? AND is_active = TRUE",
    )
    .bind(share_id)
    .fetch_optional(pool)
    .await?;
    Ok(pregnancy)
}

#[tracing::instrument(name = "store.pregnancies.update", skip(pool, changes))]
pub async fn update(pool: &SqlitePool, id: i64, changes: &PregnancyChanges) -> CoreResult<Pregnancy> {
    let pregnancy = sqlx::query_as::<_, Pregnancy>(
        r#"
        UPDATE pregnancies SET
            due_date        = COALESCE(?, due_date),
            conception_date = COALESCE(?, conception_date),
            partner_name    = COALESCE(?, partner_name),
            partner_email   = COALESCE(?, partner_email),
            baby_name       = COALESCE(?, baby_name),
            updated_at      = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(changes.due_date)
    .bind(changes.conception_date)
    .bind(&changes.partner_name)
    .bind(&changes.partner_email)
    .bind(&changes.baby_name)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?;
    pregnancy.ok_or_else(|| CoreError::NotFound("pregnancy not found".into()))
}

pub async fn set_cover_photo(pool: &SqlitePool, id: i64, filename: Option<&str>) -> CoreResult<Pregnancy> {
    let pregnancy = sqlx::query_as::<_, Pregnancy>(
        "UPDATE pregnancies SET cover_photo_filename = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(filename)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?;
    pregnancy.ok_or_else(|| CoreError::NotFound("pregnancy not found".into()))
}
