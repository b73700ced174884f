//! User-authored updates and their attachments.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{CoreError, CoreResult};
use crate::events::{self, NewEvent};
use crate::media::MediaStore;
use crate::models::{MediaKind, NewUpdate, NewUpdatePhoto, Pregnancy, PregnancyUpdate, UpdateChanges, User};
use crate::store;
use crate::validate;
use crate::week;

/// A file received with an update, not yet on disk.
#[derive(Debug, Clone)]
pub struct Upload {
    pub kind: MediaKind,
    pub original_filename: String,
    pub data: Vec<u8>,
}

fn record_shared(owner: &User, pregnancy: &Pregnancy, update: &PregnancyUpdate) -> NewEvent {
    NewEvent::update_shared(
        owner.first_name(),
        &update.title,
        update.summary(),
        update.week_number,
        pregnancy.user_id,
    )
}

/// Create an update. Its week is derived from the conception date when one
/// is known. Shared updates record `update_posted`.
#[tracing::instrument(name = "updates.create", skip_all, fields(pregnancy_id = pregnancy.id))]
pub async fn create(
    pool: &SqlitePool,
    owner: &User,
    pregnancy: &Pregnancy,
    new: &NewUpdate,
    now: DateTime<Utc>,
) -> CoreResult<PregnancyUpdate> {
    let mut new = new.clone();
    new.title = validate::required("title", &new.title)?;
    new.update_type = validate::optional(new.update_type.as_deref());

    let week_number = week::week_at(new.date.unwrap_or(now), pregnancy.conception_date);
    let update = store::updates::insert(pool, pregnancy.id, &new, week_number).await?;

    if update.is_shared {
        events::emit(pool, pregnancy.id, record_shared(owner, pregnancy, &update)).await;
    }
    tracing::info!(update_id = update.id, shared = update.is_shared, "update created");
    Ok(update)
}

/// Load an update of `pregnancy`, with attachments.
pub async fn owned(pool: &SqlitePool, pregnancy: &Pregnancy, update_id: i64) -> CoreResult<PregnancyUpdate> {
    let update = store::updates::find(pool, update_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("update not found".into()))?;
    if update.pregnancy_id != pregnancy.id {
        return Err(CoreError::Forbidden("update belongs to another pregnancy".into()));
    }
    Ok(update)
}

/// Apply an edit. The flag is true when the update went from unshared to
/// shared, in which case `update_posted` has been recorded.
pub async fn edit(
    pool: &SqlitePool,
    owner: &User,
    pregnancy: &Pregnancy,
    update_id: i64,
    changes: &UpdateChanges,
) -> CoreResult<(PregnancyUpdate, bool)> {
    let before = owned(pool, pregnancy, update_id).await?;

    let mut changes = changes.clone();
    if let Some(title) = changes.title.as_deref() {
        changes.title = Some(validate::required("title", title)?);
    }
    let updated = store::updates::apply_changes(pool, before.id, &changes).await?;

    let newly_shared = !before.is_shared && updated.is_shared;
    if newly_shared {
        events::emit(pool, pregnancy.id, record_shared(owner, pregnancy, &updated)).await;
    }
    Ok((updated, newly_shared))
}

/// Write uploads to disk and record them after any existing attachments.
pub async fn attach(
    pool: &SqlitePool,
    media: &MediaStore,
    update: &PregnancyUpdate,
    uploads: &[Upload],
    now: DateTime<Utc>,
) -> CoreResult<PregnancyUpdate> {
    let start = store::updates::next_sort_order(pool, update.id).await?;
    for (i, upload) in uploads.iter().enumerate() {
        let sort_order = start + i as i64;
        let saved = media
            .save_update_file(
                upload.kind,
                update.pregnancy_id,
                update.id,
                sort_order as usize,
                &upload.original_filename,
                &upload.data,
                now,
            )
            .await?;
        store::updates::add_photo(
            pool,
            update.id,
            &NewUpdatePhoto {
                filename: saved.filename,
                original_filename: upload.original_filename.clone(),
                file_size: saved.size,
                media_type: upload.kind,
                sort_order,
            },
        )
        .await?;
    }
    store::updates::with_photos(pool, update.clone()).await
}

/// Delete an update and, best-effort, its files.
pub async fn remove(pool: &SqlitePool, media: &MediaStore, pregnancy: &Pregnancy, update_id: i64) -> CoreResult<()> {
    let update = owned(pool, pregnancy, update_id).await?;
    let photos = store::updates::delete(pool, update.id).await?;
    for photo in &photos {
        media.remove_update_file(pregnancy.id, photo).await;
    }
    tracing::info!(update_id, files = photos.len(), "update deleted");
    Ok(())
}
