use async_trait::async_trait;

use super::{MailError, OutgoingEmail};
use crate::models::DeliveryStatus;

/// What the provider said about one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub status: DeliveryStatus,
    pub message_id: Option<String>,
}

/// Something that can hand a rendered email to a provider.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, MailError>;

    /// Verify credentials and connectivity without sending anything.
    async fn check(&self) -> Result<(), MailError>;

    fn name(&self) -> &'static str;
}

/// Used when email is disabled: messages only reach the log.
#[derive(Debug, Clone, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, MailError> {
        tracing::info!(
            to = %email.to_email,
            kind = %email.kind,
            subject = %email.subject,
            "email disabled, not sending"
        );
        Ok(SendReceipt {
            status: DeliveryStatus::Logged,
            message_id: None,
        })
    }

    async fn check(&self) -> Result<(), MailError> {
        Err(MailError::Disabled)
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
