//! Pregnancy setup, edits and invite lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{CoreError, CoreResult};
use crate::events::{self, NewEvent};
use crate::invite::{self, InviteError};
use crate::models::pregnancy::DEFAULT_BABY_NAME;
use crate::models::{NewPregnancy, Pregnancy, PregnancyChanges};
use crate::store;
use crate::validate;

/// Request body for creating a pregnancy. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PregnancyForm {
    pub due_date: String,
    pub conception_date: Option<String>,
    pub partner_name: Option<String>,
    pub partner_email: Option<String>,
    pub baby_name: Option<String>,
}

impl PregnancyForm {
    pub fn validate(&self) -> Result<NewPregnancy, validate::ValidationError> {
        let due_date = validate::date("due_date", &validate::required("due_date", &self.due_date)?)?;
        let conception_date = validate::optional(self.conception_date.as_deref())
            .map(|d| validate::date("conception_date", &d))
            .transpose()?;
        Ok(NewPregnancy {
            due_date,
            conception_date,
            partner_name: validate::optional(self.partner_name.as_deref()),
            partner_email: validate::optional(self.partner_email.as_deref()).map(|e| e.to_lowercase()),
            baby_name: Some(
                validate::optional(self.baby_name.as_deref()).unwrap_or_else(|| DEFAULT_BABY_NAME.to_string()),
            ),
        })
    }
}

/// Request body for editing a pregnancy; omitted fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PregnancyEditForm {
    pub due_date: Option<String>,
    pub conception_date: Option<String>,
    pub partner_name: Option<String>,
    pub partner_email: Option<String>,
    pub baby_name: Option<String>,
}

impl PregnancyEditForm {
    pub fn validate(&self) -> Result<PregnancyChanges, validate::ValidationError> {
        let date = |field, value: &Option<String>| {
            validate::optional(value.as_deref())
                .map(|d| validate::date(field, &d))
                .transpose()
        };
        Ok(PregnancyChanges {
            due_date: date("due_date", &self.due_date)?,
            conception_date: date("conception_date", &self.conception_date)?,
            partner_name: validate::optional(self.partner_name.as_deref()),
            partner_email: validate::optional(self.partner_email.as_deref()).map(|e| e.to_lowercase()),
            baby_name: validate::optional(self.baby_name.as_deref()),
        })
    }
}

/// Create the user's pregnancy, its default milestones and the
/// announcement event.
#[tracing::instrument(name = "pregnancy.create", skip(pool, form))]
pub async fn create(
    pool: &SqlitePool,
    user_id: i64,
    form: &PregnancyForm,
    now: DateTime<Utc>,
) -> CoreResult<Pregnancy> {
    let new = form.validate()?;
    let share_id = uuid::Uuid::new_v4().simple().to_string();
    let pregnancy = store::pregnancies::create_with_milestones(pool, user_id, &new, &share_id).await?;

    tracing::info!(pregnancy_id = pregnancy.id, user_id, "pregnancy created");
    events::emit(
        pool,
        pregnancy.id,
        NewEvent::pregnancy_announced(user_id, Some(pregnancy.current_week(now))),
    )
    .await;

    Ok(pregnancy)
}

pub async fn edit(pool: &SqlitePool, user_id: i64, form: &PregnancyEditForm) -> CoreResult<Pregnancy> {
    let changes = form.validate()?;
    let pregnancy = store::pregnancies::active_for_user(pool, user_id).await?;
    store::pregnancies::update(pool, pregnancy.id, &changes).await
}

/// Resolve an invite code to its active pregnancy.
pub async fn from_invite(pool: &SqlitePool, code: &str) -> CoreResult<Pregnancy> {
    let id = invite::decode(code)?;
    store::pregnancies::find_active_by_id(pool, id)
        .await?
        .ok_or(CoreError::Invite(InviteError::InvalidToken))
}

/// What an invitee sees before joining.
#[derive(Debug, Clone, Serialize)]
pub struct InviteInfo {
    pub parent_names: String,
    pub baby_name: String,
    pub due_date: String,
}

pub async fn invite_info(pool: &SqlitePool, pregnancy: &Pregnancy) -> CoreResult<InviteInfo> {
    Ok(InviteInfo {
        parent_names: parent_names(pool, pregnancy).await?,
        baby_name: pregnancy.baby_name().to_string(),
        due_date: pregnancy.due_date.format("%Y-%m-%d").to_string(),
    })
}

pub async fn parent_names(pool: &SqlitePool, pregnancy: &Pregnancy) -> CoreResult<String> {
    let owner = store::users::get(pool, pregnancy.user_id).await?;
    Ok(pregnancy.parent_names(&owner.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::store::testing;

    fn form(due: &str) -> PregnancyForm {
        PregnancyForm {
            due_date: due.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_announces_and_defaults_baby_name() {
        let pool = testing::pool().await;
        let user = testing::user(&pool, "a@x.com").await;

        let pregnancy = create(&pool, user.id, &form("2025-06-01"), Utc::now()).await.unwrap();
        assert_eq!(pregnancy.baby_name.as_deref(), Some("Baby"));
        assert_eq!(pregnancy.share_id.len(), 32);

        let events = store::events::list_for_pregnancy(&pool, pregnancy.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventKind::PregnancyAnnounced);
        assert_eq!(events[0].created_by, Some(user.id));
    }

    #[tokio::test]
    async fn create_rejects_bad_date() {
        let pool = testing::pool().await;
        let user = testing::user(&pool, "a@x.com").await;
        let err = create(&pool, user.id, &form("June 1st"), Utc::now()).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn invite_code_resolves_active_pregnancy_only() {
        let pool = testing::pool().await;
        let (_, pregnancy) = testing::user_with_pregnancy(&pool, "a@x.com").await;

        let code = invite::encode(pregnancy.id).unwrap();
        assert_eq!(from_invite(&pool, &code).await.unwrap().id, pregnancy.id);

        let unknown = invite::encode(pregnancy.id + 100).unwrap();
        assert!(matches!(
            from_invite(&pool, &unknown).await,
            Err(CoreError::Invite(InviteError::InvalidToken))
        ));
        assert!(matches!(
            from_invite(&pool, "xyz").await,
            Err(CoreError::Invite(InviteError::InvalidToken))
        ));
    }

    #[tokio::test]
    async fn invite_info_uses_owner_and_partner() {
        let pool = testing::pool().await;
        let (_, pregnancy) = testing::user_with_pregnancy(&pool, "a@x.com").await;
        let info = invite_info(&pool, &pregnancy).await.unwrap();
        assert_eq!(info.parent_names, "Sam Lee & Alex Kim");
        assert_eq!(info.baby_name, "Baby");
        assert_eq!(info.due_date, "2025-06-01");
    }
}
