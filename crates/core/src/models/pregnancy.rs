use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::week;

pub const DEFAULT_BABY_NAME: &str = "Baby";

/// One tracked pregnancy. Maps to the `pregnancies` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Pregnancy {
    pub id: i64,
    pub user_id: i64,
    pub partner_name: Option<String>,
    pub partner_email: Option<String>,
    pub due_date: NaiveDate,
    pub conception_date: Option<NaiveDate>,
    pub baby_name: Option<String>,
    pub is_active: bool,
    pub share_id: String,
    pub cover_photo_filename: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pregnancy {
    pub fn current_week(&self, now: DateTime<Utc>) -> i64 {
        week::current_week(now, self.conception_date, self.due_date)
    }

    pub fn baby_name(&self) -> &str {
        self.baby_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_BABY_NAME)
    }

    fn partner(&self) -> Option<&str> {
        self.partner_name.as_deref().filter(|n| !n.trim().is_empty())
    }

    /// "Owner & Partner", or just the owner's name.
    pub fn parent_names(&self, owner_name: &str) -> String {
        match self.partner() {
            Some(partner) => format!("{owner_name} & {partner}"),
            None => owner_name.to_string(),
        }
    }

    /// Like [`parent_names`](Self::parent_names) but with first names only.
    pub fn parent_first_names(&self, owner_name: &str) -> String {
        let owner = super::user::first_name(owner_name);
        match self.partner() {
            Some(partner) => format!("{owner} & {}", super::user::first_name(partner)),
            None => owner.to_string(),
        }
    }

    pub fn cover_photo_path(&self) -> Option<String> {
        self.cover_photo_filename
            .as_ref()
            .map(|f| format!("/images/covers/{f}"))
    }

    pub fn view(self, now: DateTime<Utc>) -> PregnancyView {
        let current_week = self.current_week(now);
        PregnancyView {
            weeks_remaining: week::weeks_remaining(current_week),
            is_overdue: week::is_overdue(now, self.due_date),
            cover_photo_url: self.cover_photo_path(),
            current_week,
            pregnancy: self,
        }
    }
}

/// Pregnancy with progress figures computed for display.
#[derive(Debug, Clone, Serialize)]
pub struct PregnancyView {
    #[serde(flatten)]
    pub pregnancy: Pregnancy,
    pub current_week: i64,
    pub weeks_remaining: i64,
    pub is_overdue: bool,
    pub cover_photo_url: Option<String>,
}

/// Validated fields of a pregnancy about to be created.
#[derive(Debug, Clone)]
pub struct NewPregnancy {
    pub due_date: NaiveDate,
    pub conception_date: Option<NaiveDate>,
    pub partner_name: Option<String>,
    pub partner_email: Option<String>,
    pub baby_name: Option<String>,
}

/// Partial edit; `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct PregnancyChanges {
    pub due_date: Option<NaiveDate>,
    pub conception_date: Option<NaiveDate>,
    pub partner_name: Option<String>,
    pub partner_email: Option<String>,
    pub baby_name: Option<String>,
}
