use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::CoreResult;
use crate::models::{DeliveryStatus, EmailKind, EmailNotification, NotificationSummary};

/// One finished delivery, ready to be written to the audit log.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
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
}

pub async fn insert(pool: &SqlitePool, record: &NotificationRecord) -> CoreResult<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO email_notifications
            (pregnancy_id, village_member_id, update_id, milestone_id, recipient_email,
             email_type, subject, delivery_status, ses_message_id, attempts, error_message,
             sent_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(record.pregnancy_id)
    .bind(record.village_member_id)
    .bind(record.update_id)
    .bind(record.milestone_id)
    .bind(&record.recipient_email)
    .bind(record.email_type)
    .bind(&record.subject)
    .bind(record.delivery_status)
    .bind(&record.ses_message_id)
    .bind(record.attempts)
    .bind(&record.error_message)
    .bind(record.sent_at)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn list_for_pregnancy(
    pool: &SqlitePool,
    pregnancy_id: i64,
    limit: i64,
) -> CoreResult<Vec<EmailNotification>> {
    let rows = sqlx::query_as::<_, EmailNotification>(
        r#"
        SELECT * FROM email_notifications
        WHERE pregnancy_id = ?
        ORDER BY julianday(sent_at) DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(pregnancy_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn summary(pool: &SqlitePool, pregnancy_id: i64) -> CoreResult<NotificationSummary> {
    let (total_sent, total_delivered, total_failed, total_bounced): (i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN delivery_status = 'delivered' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN delivery_status IN ('failed', 'bounced', 'complaint') THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN delivery_status = 'bounced' THEN 1 ELSE 0 END), 0)
        FROM email_notifications
        WHERE pregnancy_id = ?
        "#,
    )
    .bind(pregnancy_id)
    .fetch_one(pool)
    .await?;

    let delivery_rate = if total_sent > 0 {
        total_delivered as f64 / total_sent as f64 * 100.0
    } else {
        0.0
    };

    Ok(NotificationSummary {
        total_sent,
        total_delivered,
        total_failed,
        total_bounced,
        delivery_rate,
    })
}
