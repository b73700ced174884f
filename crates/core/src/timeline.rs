//! Combined feed of recorded events and user updates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::error::CoreResult;
use crate::models::{MediaKind, PregnancyUpdate, UpdatePhoto};
use crate::store;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Raw `?limit=&offset=` query. Anything unparseable or out of range falls
/// back to the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl PageQuery {
    pub fn page(&self) -> Page {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        Page {
            limit: parse(&self.limit)
                .filter(|l| (1..=MAX_LIMIT).contains(l))
                .unwrap_or(DEFAULT_LIMIT),
            offset: parse(&self.offset).filter(|o| *o >= 0).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Event,
    Update,
}

/// Attachment as shown in a feed.
#[derive(Debug, Clone, Serialize)]
pub struct MediaItem {
    pub id: i64,
    pub url: String,
    pub media_type: MediaKind,
    pub original_filename: String,
    pub caption: Option<String>,
}

impl MediaItem {
    fn from_photo(photo: &UpdatePhoto, pregnancy_id: i64) -> Self {
        Self {
            id: photo.id,
            url: photo.url_path(pregnancy_id),
            media_type: photo.media_type,
            original_filename: photo.original_filename.clone(),
            caption: photo.caption.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub week_number: Option<i64>,
    /// Effective date: event creation, or the update's date.
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<MediaItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelinePage {
    pub events: Vec<TimelineItem>,
    pub total: i64,
}

#[derive(Debug, FromRow)]
struct FeedRow {
    item_type: String,
    id: i64,
    title: String,
    description: Option<String>,
    week_number: Option<i64>,
    item_date: String,
    event_type: Option<String>,
    update_type: Option<String>,
}

/// One page of the private feed. `update_posted` events are left out since
/// the update itself is already in the feed.
#[tracing::instrument(name = "timeline.page", skip(pool))]
pub async fn page(pool: &SqlitePool, pregnancy_id: i64, page: Page) -> CoreResult<TimelinePage> {
    let rows = sqlx::query_as::<_, FeedRow>(
        r#"
        SELECT 'event' AS item_type, id, title, description, week_number,
               created_at AS item_date, event_type, NULL AS update_type,
               julianday(created_at) AS sort_key
        FROM pregnancy_events
        WHERE pregnancy_id = ? AND event_type != 'update_posted'
        UNION ALL
        SELECT 'update' AS item_type, id, title, content AS description, week_number,
               COALESCE(update_date, created_at) AS item_date, NULL AS event_type, update_type,
               julianday(COALESCE(update_date, created_at)) AS sort_key
        FROM pregnancy_updates
        WHERE pregnancy_id = ?
        ORDER BY sort_key DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(pregnancy_id)
    .bind(pregnancy_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT
            (SELECT COUNT(*) FROM pregnancy_events
             WHERE pregnancy_id = ? AND event_type != 'update_posted')
          + (SELECT COUNT(*) FROM pregnancy_updates WHERE pregnancy_id = ?)
        "#,
    )
    .bind(pregnancy_id)
    .bind(pregnancy_id)
    .fetch_one(pool)
    .await?;

    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let kind = if row.item_type == "update" {
            ItemKind::Update
        } else {
            ItemKind::Event
        };
        let photos = match kind {
            ItemKind::Update => store::updates::photos(pool, row.id)
                .await?
                .iter()
                .map(|p| MediaItem::from_photo(p, pregnancy_id))
                .collect(),
            ItemKind::Event => Vec::new(),
        };
        events.push(TimelineItem {
            kind,
            id: row.id,
            title: row.title,
            description: row.description,
            week_number: row.week_number,
            date: normalize_timestamp(&row.item_date),
            event_type: row.event_type,
            update_type: row.update_type,
            photos,
        });
    }

    Ok(TimelinePage { events, total })
}

/// An update as shown on the public timeline.
#[derive(Debug, Clone, Serialize)]
pub struct SharedUpdate {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub update_type: String,
    pub appointment_type: Option<String>,
    pub week_number: Option<i64>,
    pub date: String,
    pub photos: Vec<MediaItem>,
}

impl SharedUpdate {
    fn new(update: PregnancyUpdate, raw_date: &str) -> Self {
        let photos = update
            .photos
            .iter()
            .map(|p| MediaItem::from_photo(p, update.pregnancy_id))
            .collect();
        Self {
            id: update.id,
            title: update.title,
            content: update.content,
            update_type: update.update_type,
            appointment_type: update.appointment_type,
            week_number: update.week_number,
            date: normalize_timestamp(raw_date),
            photos,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SharedPage {
    pub updates: Vec<SharedUpdate>,
    /// Shared updates across all pages.
    pub total: i64,
}

/// One page of shared updates; never events and never unshared updates.
#[tracing::instrument(name = "timeline.shared", skip(pool))]
pub async fn shared_updates(pool: &SqlitePool, pregnancy_id: i64, page: Page) -> CoreResult<SharedPage> {
    let rows = store::updates::list_shared_raw(pool, pregnancy_id, page.limit, page.offset).await?;
    let total = store::updates::count_shared(pool, pregnancy_id).await?;
    Ok(SharedPage {
        updates: rows
            .into_iter()
            .map(|(update, raw)| SharedUpdate::new(update, &raw))
            .collect(),
        total,
    })
}

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Render a stored timestamp as UTC RFC 3339. Unrecognised input is returned
/// unchanged.
pub fn normalize_timestamp(raw: &str) -> String {
    let raw_trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw_trimmed) {
        return format_utc(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw_trimmed, fmt) {
            return format_utc(dt.and_utc());
        }
    }
    if let Some(dt) = NaiveDate::parse_from_str(raw_trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return format_utc(dt.and_utc());
    }
    raw.to_string()
}

fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}
