use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EmailKind {
    Update,
    Milestone,
    Announcement,
    Welcome,
    Reminder,
    AccessRequest,
    Test,
}

impl fmt::Display for EmailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EmailKind::Update => "update",
            EmailKind::Milestone => "milestone",
            EmailKind::Announcement => "announcement",
            EmailKind::Welcome => "welcome",
            EmailKind::Reminder => "reminder",
            EmailKind::AccessRequest => "access_request",
            EmailKind::Test => "test",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Bounced,
    Failed,
    Complaint,
    /// Email is disabled; the message was only written to the log.
    Logged,
}

/// Audit row for one delivery attempt. Maps to `email_notifications`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmailNotification {
    pub id: i64,
    pub pregnancy_id: Option<i64>,
    pub village_member_id: Option<i64>,
    pub update_id: Option<i64>,
    pub milestone_id: Option<i64>,
    pub recipient_email: String,
    pub email_type: EmailKind,
    pub subject: String,
    pub delivery_status: DeliveryStatus,
    pub ses_message_id: Option<String>,
    pub attempts: i64,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationSummary {
    pub total_sent: i64,
    pub total_delivered: i64,
    pub total_failed: i64,
    pub total_bounced: i64,
    /// Percentage of sent messages confirmed delivered.
    pub delivery_rate: f64,
}
