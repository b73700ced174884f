use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_UPDATE_TYPE: &str = "general";

/// User-authored post. Maps to `pregnancy_updates`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PregnancyUpdate {
    pub id: i64,
    pub pregnancy_id: i64,
    pub week_number: Option<i64>,
    pub title: String,
    pub content: Option<String>,
    pub update_type: String,
    pub appointment_type: Option<String>,
    pub is_shared: bool,
    pub shared_at: Option<DateTime<Utc>>,
    pub update_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub photos: Vec<UpdatePhoto>,
}

impl PregnancyUpdate {
    /// Date the update is about, falling back to when it was written.
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.update_date.unwrap_or(self.created_at)
    }

    /// Text used when the update is announced elsewhere.
    pub fn summary(&self) -> &str {
        self.content
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.title)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Attachment of an update; videos share the table. Maps to `update_photos`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UpdatePhoto {
    pub id: i64,
    pub update_id: i64,
    pub filename: String,
    pub original_filename: String,
    pub file_size: i64,
    pub media_type: MediaKind,
    pub caption: Option<String>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

impl UpdatePhoto {
    /// Public URL path under `/images` or `/videos`.
    pub fn url_path(&self, pregnancy_id: i64) -> String {
        let root = match self.media_type {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        };
        format!("/{root}/{pregnancy_id}/{}", self.filename)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUpdate {
    pub title: String,
    pub content: Option<String>,
    pub update_type: Option<String>,
    pub appointment_type: Option<String>,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(alias = "update_date")]
    pub date: Option<DateTime<Utc>>,
}

/// Partial edit; `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub update_type: Option<String>,
    pub appointment_type: Option<String>,
    pub is_shared: Option<bool>,
    #[serde(alias = "update_date")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewUpdatePhoto {
    pub filename: String,
    pub original_filename: String,
    pub file_size: i64,
    pub media_type: MediaKind,
    pub sort_order: i64,
}
