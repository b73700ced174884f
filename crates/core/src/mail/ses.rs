//! Amazon SES v2 through the AWS SDK.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sesv2::config::Credentials;
use aws_sdk_sesv2::error::DisplayErrorContext;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client;

use super::{MailError, MailTransport, OutgoingEmail, SendReceipt};
use crate::models::DeliveryStatus;

const CHARSET: &str = "UTF-8";

#[derive(Debug, Clone)]
pub struct SesCredentials {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl SesCredentials {
    /// Configured keys, or `None` to fall back to the SDK's default chain
    /// (environment, profile, instance role).
    fn static_keys(&self) -> Option<Credentials> {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return None;
        }
        Some(Credentials::new(
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            None,
            None,
            "fortyweeks-config",
        ))
    }
}

async fn sdk_config(credentials: &SesCredentials, timeout: Duration) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(credentials.region.clone()))
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(timeout)
                .build(),
        );
    if let Some(keys) = credentials.static_keys() {
        loader = loader.credentials_provider(keys);
    }
    loader.load().await
}

fn content(data: &str) -> Result<Content, MailError> {
    Ok(Content::builder().data(data).charset(CHARSET).build()?)
}

fn email_content(email: &OutgoingEmail) -> Result<EmailContent, MailError> {
    let message = Message::builder()
        .subject(content(&email.subject)?)
        .body(
            Body::builder()
                .html(content(&email.html)?)
                .text(content(&email.text)?)
                .build(),
        )
        .build();
    Ok(EmailContent::builder().simple(message).build())
}

fn provider_error<E>(err: E) -> MailError
where
    E: std::error::Error,
{
    MailError::Provider(DisplayErrorContext(err).to_string())
}

pub struct SesTransport {
    client: Client,
    from: String,
}

impl SesTransport {
    pub async fn new(credentials: SesCredentials, from: String, timeout: Duration) -> Self {
        let config = sdk_config(&credentials, timeout).await;
        Self {
            client: Client::new(&config),
            from,
        }
    }
}

#[async_trait]
impl MailTransport for SesTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, MailError> {
        let output = self
            .client
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(&email.to_email).build())
            .content(email_content(email)?)
            .send()
            .await
            .map_err(provider_error)?;

        Ok(SendReceipt {
            status: DeliveryStatus::Sent,
            message_id: output.message_id().map(str::to_string),
        })
    }

    async fn check(&self) -> Result<(), MailError> {
        self.client
            .get_account()
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ses"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailKind;

    fn credentials(key: &str, secret: &str) -> SesCredentials {
        SesCredentials {
            region: "eu-west-1".into(),
            access_key_id: key.into(),
            secret_access_key: secret.into(),
        }
    }

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to_email: "gran@x.com".into(),
            to_name: "Gran".into(),
            subject: "Week 20 Update from Sam".into(),
            html: "<p>Hi</p>".into(),
            text: "Hi".into(),
            kind: EmailKind::Update,
            pregnancy_id: Some(1),
            village_member_id: Some(2),
            update_id: Some(3),
            milestone_id: None,
        }
    }

    #[test]
    fn configured_keys_are_used_as_static_credentials() {
        let keys = credentials("AKIDEXAMPLE", "secret").static_keys().unwrap();
        assert_eq!(keys.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(keys.secret_access_key(), "secret");
        assert!(keys.session_token().is_none());
    }

    #[test]
    fn missing_keys_fall_back_to_default_chain() {
        assert!(credentials("", "").static_keys().is_none());
        assert!(credentials("AKIDEXAMPLE", "").static_keys().is_none());
    }

    #[tokio::test]
    async fn sdk_config_carries_region_and_timeout() {
        let config = sdk_config(&credentials("AKIDEXAMPLE", "secret"), Duration::from_secs(7)).await;
        assert_eq!(config.region().map(|r| r.as_ref()), Some("eu-west-1"));
        assert_eq!(
            config.timeout_config().and_then(|t| t.operation_timeout()),
            Some(Duration::from_secs(7))
        );
        assert!(config.credentials_provider().is_some());
    }

    #[test]
    fn message_has_subject_and_both_bodies_in_utf8() {
        let content = email_content(&email()).unwrap();
        let message = content.simple().unwrap();
        let subject = message.subject().unwrap();
        assert_eq!(subject.data(), "Week 20 Update from Sam");
        assert_eq!(subject.charset(), Some("UTF-8"));

        let body = message.body().unwrap();
        assert_eq!(body.html().unwrap().data(), "<p>Hi</p>");
        assert_eq!(body.text().unwrap().data(), "Hi");
    }
}
