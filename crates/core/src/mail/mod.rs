//! Outbound email: templates, transports and the delivery queue.

mod compose;
mod dispatcher;
mod notify;
mod ses;
mod templates;
mod transport;

use thiserror::Error;

use crate::models::EmailKind;

pub use compose::{display_date, Composer, MailSettings, PregnancyContext};
pub use dispatcher::EmailDispatcher;
pub use notify::Mailer;
pub use ses::{SesCredentials, SesTransport};
pub use templates::{EmailTemplate, Templates};
pub use transport::{LogTransport, MailTransport, SendReceipt};

#[derive(Debug, Error)]
pub enum MailError {
    #[error(transparent)]
    Template(#[from] tera::Error),

    #[error("invalid email request: {0}")]
    Request(#[from] aws_sdk_sesv2::error::BuildError),

    #[error("email provider request failed: {0}")]
    Provider(String),

    #[error("email service is disabled")]
    Disabled,
}

/// A fully rendered message plus the references kept in the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub kind: EmailKind,
    pub pregnancy_id: Option<i64>,
    pub village_member_id: Option<i64>,
    pub update_id: Option<i64>,
    pub milestone_id: Option<i64>,
}
