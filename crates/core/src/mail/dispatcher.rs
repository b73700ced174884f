//! Background delivery so requests never wait on the email provider.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{MailError, MailTransport, OutgoingEmail, SendReceipt};
use crate::models::DeliveryStatus;
use crate::store;
use crate::store::notifications::NotificationRecord;

struct Delivery {
    pool: SqlitePool,
    transport: Arc<dyn MailTransport>,
    max_attempts: u32,
}

impl Delivery {
    /// Try up to `max_attempts` times, then write one audit row.
    async fn deliver(&self, email: &OutgoingEmail) -> Result<SendReceipt, MailError> {
        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            match self.transport.send(email).await {
                Ok(receipt) => break Ok(receipt),
                Err(err) if attempts < self.max_attempts => {
                    tracing::warn!(to = %email.to_email, attempt = attempts, error = %err, "email send failed, retrying");
                }
                Err(err) => break Err(err),
            }
        };

        let (status, message_id, error_message) = match &result {
            Ok(receipt) => (receipt.status, receipt.message_id.clone(), None),
            Err(err) => (DeliveryStatus::Failed, None, Some(err.to_string())),
        };
        match &result {
            Ok(_) => tracing::info!(
                to = %email.to_email,
                kind = %email.kind,
                transport = self.transport.name(),
                message_id = message_id.as_deref().unwrap_or(""),
                "email delivered"
            ),
            Err(err) => tracing::error!(to = %email.to_email, kind = %email.kind, attempts, error = %err, "email delivery failed"),
        }

        let record = NotificationRecord {
            pregnancy_id: email.pregnancy_id,
            village_member_id: email.village_member_id,
            update_id: email.update_id,
            milestone_id: email.milestone_id,
            recipient_email: email.to_email.clone(),
            email_type: email.kind,
            subject: email.subject.clone(),
            delivery_status: status,
            ses_message_id: message_id,
            attempts: i64::from(attempts),
            error_message,
            sent_at: Utc::now(),
        };
        if let Err(err) = store::notifications::insert(&self.pool, &record).await {
            tracing::warn!(to = %email.to_email, error = %err, "failed to record email notification");
        }

        result
    }
}

/// Handle to the delivery queue. Cheap to clone.
#[derive(Clone)]
pub struct EmailDispatcher {
    tx: mpsc::Sender<OutgoingEmail>,
    delivery: Arc<Delivery>,
}

impl EmailDispatcher {
    /// Start the worker. It runs until every dispatcher handle is dropped.
    pub fn spawn(
        pool: SqlitePool,
        transport: Arc<dyn MailTransport>,
        capacity: usize,
        max_attempts: u32,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<OutgoingEmail>(capacity.max(1));
        let delivery = Arc::new(Delivery {
            pool,
            transport,
            max_attempts: max_attempts.max(1),
        });

        let worker = Arc::clone(&delivery);
        let handle = tokio::spawn(async move {
            while let Some(email) = rx.recv().await {
                // failures are already logged and audited
                let _ = worker.deliver(&email).await;
            }
            tracing::debug!("email queue closed");
        });

        (Self { tx, delivery }, handle)
    }

    /// Queue a message without waiting. Returns false if it was dropped.
    pub fn enqueue(&self, email: OutgoingEmail) -> bool {
        match self.tx.try_send(email) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(email)) => {
                tracing::warn!(to = %email.to_email, kind = %email.kind, "email queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(email)) => {
                tracing::error!(to = %email.to_email, kind = %email.kind, "email queue closed, dropping message");
                false
            }
        }
    }

    /// Deliver immediately on the caller's task, still writing the audit row.
    pub async fn deliver_now(&self, email: &OutgoingEmail) -> Result<SendReceipt, MailError> {
        self.delivery.deliver(email).await
    }

    pub async fn check_transport(&self) -> Result<(), MailError> {
        self.delivery.transport.check().await
    }

    pub fn transport_name(&self) -> &'static str {
        self.delivery.transport.name()
    }
}
