use std::collections::HashMap;

use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::{CoreError, CoreResult};
use crate::models::update::DEFAULT_UPDATE_TYPE;
use crate::models::{NewUpdate, NewUpdatePhoto, PregnancyUpdate, UpdateChanges, UpdatePhoto};

pub async fn insert(
    pool: &SqlitePool,
    pregnancy_id: i64,
    new: &NewUpdate,
    week_number: Option<i64>,
) -> CoreResult<PregnancyUpdate> {
    let now = Utc::now();
    let update = sqlx::query_as::<_, PregnancyUpdate>(
        r#"
        INSERT INTO pregnancy_updates
            (pregnancy_id, week_number, title, content, update_type, appointment_type,
             is_shared, shared_at, update_date, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(pregnancy_id)
    .bind(week_number)
    .bind(&new.title)
    .bind(&new.content)
    .bind(new.update_type.as_deref().unwrap_or(DEFAULT_UPDATE_TYPE))
    .bind(&new.appointment_type)
    .bind(new.is_shared)
    .bind(new.is_shared.then_some(now))
    .bind(new.date.unwrap_or(now))
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(update)
}

pub async fn find(pool: &SqlitePool, id: i64) -> CoreResult<Option<PregnancyUpdate>> {
    let update = sqlx::query_as::<_, PregnancyUpdate>("SELECT * FROM pregnancy_updates WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match update {
        Some(update) => Ok(Some(with_photos(pool, update).await?)),
        None => Ok(None),
    }
}

/// All updates of a pregnancy, newest effective date first, with attachments.
pub async fn list_for_pregnancy(pool: &SqlitePool, pregnancy_id: i64) -> CoreResult<Vec<PregnancyUpdate>> {
    let updates = sqlx::query_as::<_, PregnancyUpdate>(
        r#"
        SELECT * FROM pregnancy_updates
        WHERE pregnancy_id = ?
        ORDER BY julianday(COALESCE(update_date, created_at)) DESC, id DESC
        "#,
    )
    .bind(pregnancy_id)
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(updates.len());
    for update in updates {
        out.push(with_photos(pool, update).await?);
    }
    Ok(out)
}

/// Apply a partial edit. `shared_at` is set when sharing turns on and
/// cleared when it turns off.
pub async fn apply_changes(pool: &SqlitePool, id: i64, changes: &UpdateChanges) -> CoreResult<PregnancyUpdate> {
    let now = Utc::now();
    let update = sqlx::query_as::<_, PregnancyUpdate>(
        r#"
        UPDATE pregnancy_updates SET
            title            = COALESCE(?, title),
            content          = COALESCE(?, content),
            update_type      = COALESCE(?, update_type),
            appointment_type = COALESCE(?, appointment_type),
            update_date      = COALESCE(?, update_date),
            shared_at        = CASE
                                 WHEN ? IS NULL THEN shared_at
                                 WHEN ? AND NOT is_shared THEN ?
                                 WHEN ? THEN shared_at
                                 ELSE NULL
                               END,
            is_shared        = COALESCE(?, is_shared),
            updated_at       = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&changes.title)
    .bind(&changes.content)
    .bind(&changes.update_type)
    .bind(&changes.appointment_type)
    .bind(changes.date)
    .bind(changes.is_shared)
    .bind(changes.is_shared)
    .bind(now)
    .bind(changes.is_shared)
    .bind(changes.is_shared)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match update {
        Some(update) => with_photos(pool, update).await,
        None => Err(CoreError::NotFound("update not found".into())),
    }
}

/// Delete an update, returning its attachments so their files can be removed.
pub async fn delete(pool: &SqlitePool, id: i64) -> CoreResult<Vec<UpdatePhoto>> {
    let photos = photos(pool, id).await?;
    sqlx::query("DELETE FROM pregnancy_updates WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(photos)
}

pub async fn add_photo(pool: &SqlitePool, update_id: i64, photo: &NewUpdatePhoto) -> CoreResult<UpdatePhoto> {
    let row = sqlx::query_as::<_, UpdatePhoto>(
        r#"
        INSERT INTO update_photos
            (update_id, filename, original_filename, file_size, media_type, sort_order, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(update_id)
    .bind(&photo.filename)
    .bind(&photo.original_filename)
    .bind(photo.file_size)
    .bind(photo.media_type)
    .bind(photo.sort_order)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn photos(pool: &SqlitePool, update_id: i64) -> CoreResult<Vec<UpdatePhoto>> {
    let rows = sqlx::query_as::<_, UpdatePhoto>(
        "SELECT * FROM update_photos WHERE update_id = ? ORDER BY sort_order ASC, id ASC",
    )
    .bind(update_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Next free sort position for new attachments.
pub async fn next_sort_order(pool: &SqlitePool, update_id: i64) -> CoreResult<i64> {
    let max: Option<i64> = sqlx::query_scalar("SELECT MAX(sort_order) FROM update_photos WHERE update_id = ?")
        .bind(update_id)
        .fetch_one(pool)
        .await?;
    Ok(max.map_or(0, |m| m + 1))
}

pub async fn with_photos(pool: &SqlitePool, mut update: PregnancyUpdate) -> CoreResult<PregnancyUpdate> {
    update.photos = photos(pool, update.id).await?;
    Ok(update)
}

/// Attachments of several updates, keyed by update id.
pub async fn photos_for(pool: &SqlitePool, update_ids: &[i64]) -> CoreResult<HashMap<i64, Vec<UpdatePhoto>>> {
    let mut grouped: HashMap<i64, Vec<UpdatePhoto>> = HashMap::new();
    if update_ids.is_empty() {
        return Ok(grouped);
    }

    let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM update_photos WHERE update_id IN (");
    let mut ids = query.separated(", ");
    for id in update_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY sort_order ASC, id ASC");

    let rows = query.build_query_as::<UpdatePhoto>().fetch_all(pool).await?;
    for photo in rows {
        grouped.entry(photo.update_id).or_default().push(photo);
    }
    Ok(grouped)
}

#[derive(FromRow)]
struct SharedRow {
    #[sqlx(flatten)]
    update: PregnancyUpdate,
    effective_date: String,
}

/// One page of shared updates in effective-date order, with the raw stored
/// date text.
pub async fn list_shared_raw(
    pool: &SqlitePool,
    pregnancy_id: i64,
    limit: i64,
    offset: i64,
) -> CoreResult<Vec<(PregnancyUpdate, String)>> {
    let rows = sqlx::query_as::<_, SharedRow>(
        r#"
        SELECT *, COALESCE(update_date, created_at) AS effective_date
        FROM pregnancy_updates
        WHERE pregnancy_id = ? AND is_shared = TRUE
        ORDER BY julianday(COALESCE(update_date, created_at)) DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(pregnancy_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let ids: Vec<i64> = rows.iter().map(|row| row.update.id).collect();
    let mut photos = photos_for(pool, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|mut row| {
            row.update.photos = photos.remove(&row.update.id).unwrap_or_default();
            (row.update, row.effective_date)
        })
        .collect())
}

pub async fn count_shared(pool: &SqlitePool, pregnancy_id: i64) -> CoreResult<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pregnancy_updates WHERE pregnancy_id = ? AND is_shared = TRUE",
    )
    .bind(pregnancy_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
