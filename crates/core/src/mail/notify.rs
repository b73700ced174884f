use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{Composer, EmailDispatcher, MailError, OutgoingEmail, PregnancyContext, SendReceipt};
use crate::error::CoreResult;
use crate::models::{AccessRequest, Milestone, Pregnancy, PregnancyUpdate, VillageMember};
use crate::store;

/// Builds emails for domain events and queues them for delivery.
#[derive(Clone)]
pub struct Mailer {
    composer: Composer,
    dispatcher: EmailDispatcher,
}

impl Mailer {
    pub fn new(composer: Composer, dispatcher: EmailDispatcher) -> Self {
        Self { composer, dispatcher }
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn transport_name(&self) -> &'static str {
        self.dispatcher.transport_name()
    }

    async fn context<'a>(
        &self,
        pool: &SqlitePool,
        pregnancy: &'a Pregnancy,
        now: DateTime<Utc>,
    ) -> CoreResult<PregnancyContext<'a>> {
        Ok(PregnancyContext {
            pregnancy,
            parent_names: crate::pregnancy::parent_names(pool, pregnancy).await?,
            now,
        })
    }

    fn enqueue_rendered(&self, rendered: Result<OutgoingEmail, MailError>) -> bool {
        match rendered {
            Ok(email) => self.dispatcher.enqueue(email),
            Err(err) => {
                tracing::error!(error = %err, "failed to render email");
                false
            }
        }
    }

    /// Queue one update email per subscribed member. Returns how many were queued.
    #[tracing::instrument(name = "mail.notify_update", skip_all, fields(pregnancy_id = pregnancy.id, update_id = update.id))]
    pub async fn notify_update(
        &self,
        pool: &SqlitePool,
        pregnancy: &Pregnancy,
        update: &PregnancyUpdate,
        now: DateTime<Utc>,
    ) -> CoreResult<usize> {
        let members = store::village::list_subscribed(pool, pregnancy.id).await?;
        if members.is_empty() {
            tracing::debug!("no subscribed village members");
            return Ok(0);
        }
        let ctx = self.context(pool, pregnancy, now).await?;
        Ok(members
            .iter()
            .filter(|m| self.enqueue_rendered(self.composer.update(&ctx, update, m)))
            .count())
    }

    #[tracing::instrument(name = "mail.notify_milestone", skip_all, fields(pregnancy_id = pregnancy.id, milestone_id = milestone.id))]
    pub async fn notify_milestone(
        &self,
        pool: &SqlitePool,
        pregnancy: &Pregnancy,
        milestone: &Milestone,
        now: DateTime<Utc>,
    ) -> CoreResult<usize> {
        let members = store::village::list_subscribed(pool, pregnancy.id).await?;
        if members.is_empty() {
            return Ok(0);
        }
        let ctx = self.context(pool, pregnancy, now).await?;
        Ok(members
            .iter()
            .filter(|m| self.enqueue_rendered(self.composer.milestone(&ctx, milestone, m)))
            .count())
    }

    pub async fn welcome(
        &self,
        pool: &SqlitePool,
        pregnancy: &Pregnancy,
        member: &VillageMember,
        now: DateTime<Utc>,
    ) -> CoreResult<bool> {
        let ctx = self.context(pool, pregnancy, now).await?;
        Ok(self.enqueue_rendered(self.composer.welcome(&ctx, member)))
    }

    pub async fn notify_access_request(
        &self,
        pool: &SqlitePool,
        pregnancy: &Pregnancy,
        request: &AccessRequest,
        now: DateTime<Utc>,
    ) -> CoreResult<bool> {
        let owner = store::users::get(pool, pregnancy.user_id).await?;
        let ctx = self.context(pool, pregnancy, now).await?;
        Ok(self.enqueue_rendered(self.composer.access_request(&ctx, &owner, request)))
    }

    /// Send a test message synchronously.
    pub async fn send_test(&self, to_email: &str, to_name: &str, now: DateTime<Utc>) -> Result<SendReceipt, MailError> {
        let email = self.composer.test(to_email, to_name, now)?;
        self.dispatcher.deliver_now(&email).await
    }

    pub async fn check_config(&self) -> Result<(), MailError> {
        self.dispatcher.check_transport().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::events::JoinSource;
    use crate::mail::dispatcher::tests::{wait_for_rows, RecordingTransport};
    use crate::mail::{MailSettings, Templates};
    use crate::models::{EmailKind, NewUpdate, NewVillageMember};
    use crate::store::testing;
    use crate::village;

    fn mailer(pool: &SqlitePool, transport: Arc<RecordingTransport>) -> Mailer {
        let composer = Composer::new(
            Arc::new(Templates::load().unwrap()),
            MailSettings {
                sender_email: "noreply@40weeks.app".into(),
                sender_name: "40Weeks".into(),
                base_url: "http://localhost:8080".into(),
            },
        );
        let (dispatcher, _worker) = EmailDispatcher::spawn(pool.clone(), transport, 16, 1);
        Mailer::new(composer, dispatcher)
    }

    async fn add(pool: &SqlitePool, pregnancy: &Pregnancy, email: &str) -> VillageMember {
        village::add_member(
            pool,
            pregnancy,
            &NewVillageMember {
                name: "Gran".into(),
                email: email.into(),
                relationship: "grandmother".into(),
                is_told: true,
            },
            JoinSource::Manual,
            Utc::now(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn update_emails_skip_unsubscribed_members() {
        let pool = testing::pool().await;
        let (_, pregnancy) = testing::user_with_pregnancy(&pool, "a@x.com").await;
        add(&pool, &pregnancy, "gran@x.com").await;
        let gone = add(&pool, &pregnancy, "gone@x.com").await;
        store::village::unsubscribe(&pool, &gone.unsubscribe_token).await.unwrap();

        let update = store::updates::insert(
            &pool,
            pregnancy.id,
            &NewUpdate {
                title: "Scan".into(),
                is_shared: true,
                ..Default::default()
            },
            Some(20),
        )
        .await
        .unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let mailer = mailer(&pool, transport.clone());
        let queued = mailer.notify_update(&pool, &pregnancy, &update, Utc::now()).await.unwrap();
        assert_eq!(queued, 1);

        let rows = wait_for_rows(&pool, pregnancy.id, 1).await;
        assert_eq!(rows[0].email_type, EmailKind::Update);
        assert_eq!(rows[0].update_id, Some(update.id));
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].to_email, "gran@x.com");
        assert_eq!(sent[0].subject, "Week 20 Update from Sam Lee & Alex Kim");
    }

    #[tokio::test]
    async fn access_request_email_goes_to_owner() {
        let pool = testing::pool().await;
        let (owner, pregnancy) = testing::user_with_pregnancy(&pool, "a@x.com").await;
        let request = store::access_requests::insert(&pool, pregnancy.id, "jo@x.com", "Jo", "cousin", None)
            .await
            .unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let mailer = mailer(&pool, transport.clone());
        assert!(mailer.notify_access_request(&pool, &pregnancy, &request, Utc::now()).await.unwrap());

        wait_for_rows(&pool, pregnancy.id, 1).await;
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].to_email, owner.email);
        assert_eq!(sent[0].subject, "New access request for your pregnancy timeline");
        assert!(sent[0].text.contains("Requester: Jo"));
    }
}
