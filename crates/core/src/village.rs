//! Village membership rules: adding followers and tracking who has been told.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{CoreError, CoreResult};
use crate::events::{self, JoinSource, NewEvent};
use crate::models::{NewVillageMember, Pregnancy, VillageMember};
use crate::store;
use crate::store::village::MemberRow;
use crate::validate::{self, ValidationError};

/// Several people sharing one name and relationship, e.g. a couple.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkMembers {
    pub name: String,
    #[serde(default)]
    pub emails: Vec<String>,
    /// Single-address form accepted by the invite page.
    pub email: Option<String>,
    pub relationship: String,
    #[serde(default)]
    pub is_told: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub created: Vec<VillageMember>,
    /// Addresses already in the village.
    pub skipped: Vec<String>,
}

/// Add one member and record `villager_joined`.
#[tracing::instrument(name = "village.add_member", skip(pool, pregnancy, new), fields(pregnancy_id = pregnancy.id))]
pub async fn add_member(
    pool: &SqlitePool,
    pregnancy: &Pregnancy,
    new: &NewVillageMember,
    source: JoinSource,
    now: DateTime<Utc>,
) -> CoreResult<VillageMember> {
    let name = validate::required("name", &new.name)?;
    let email = validate::email("email", &new.email)?;
    let relationship = validate::required("relationship", &new.relationship)?;

    if store::village::exists_with_email(pool, pregnancy.id, &email).await? {
        return Err(CoreError::Conflict(store::village::DUPLICATE_MEMBER.into()));
    }

    let row = MemberRow {
        name: &name,
        email: &email,
        relationship: &relationship,
        is_told: new.is_told,
    };
    let member = store::village::insert(pool, pregnancy.id, &row).await?;

    events::emit(
        pool,
        pregnancy.id,
        NewEvent::villager_joined(
            source,
            &member.name,
            &member.relationship,
            Some(pregnancy.current_week(now)),
            pregnancy.user_id,
        ),
    )
    .await;

    Ok(member)
}

/// Add one member per address. Names get a " (n)" suffix when there is
/// more than one address; addresses already present are skipped.
pub async fn add_members(
    pool: &SqlitePool,
    pregnancy: &Pregnancy,
    bulk: &BulkMembers,
    source: JoinSource,
    now: DateTime<Utc>,
) -> CoreResult<BulkOutcome> {
    let name = validate::required("name", &bulk.name)?;
    let emails: Vec<String> = bulk
        .emails
        .iter()
        .chain(bulk.email.iter())
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect();
    if emails.is_empty() {
        return Err(ValidationError::Missing("emails").into());
    }

    let numbered = emails.len() > 1;
    let mut outcome = BulkOutcome::default();
    for (i, email) in emails.into_iter().enumerate() {
        let new = NewVillageMember {
            name: if numbered { format!("{name} ({})", i + 1) } else { name.clone() },
            email: email.clone(),
            relationship: bulk.relationship.clone(),
            is_told: bulk.is_told,
        };
        match add_member(pool, pregnancy, &new, source, now).await {
            Ok(member) => outcome.created.push(member),
            Err(CoreError::Conflict(_)) => outcome.skipped.push(email),
            Err(err) => return Err(err),
        }
    }
    Ok(outcome)
}

/// Load a member, checking it belongs to `pregnancy`.
pub async fn owned_member(pool: &SqlitePool, pregnancy: &Pregnancy, member_id: i64) -> CoreResult<VillageMember> {
    let member = store::village::find(pool, member_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("village member not found".into()))?;
    if member.pregnancy_id != pregnancy.id {
        return Err(CoreError::Forbidden("village member belongs to another pregnancy".into()));
    }
    Ok(member)
}

/// Flip the told flag. `villager_told` is recorded only on false → true.
pub async fn set_told(
    pool: &SqlitePool,
    pregnancy: &Pregnancy,
    member_id: i64,
    is_told: bool,
    now: DateTime<Utc>,
) -> CoreResult<VillageMember> {
    let member = owned_member(pool, pregnancy, member_id).await?;
    if member.is_told == is_told {
        return Ok(member);
    }

    let told_date = is_told.then_some(now);
    let updated = store::village::set_told(pool, member.id, is_told, told_date).await?;

    if is_told {
        events::emit(
            pool,
            pregnancy.id,
            NewEvent::villager_told(&updated.name, pregnancy.user_id, Some(pregnancy.current_week(now))),
        )
        .await;
    }
    Ok(updated)
}

pub async fn remove(pool: &SqlitePool, pregnancy: &Pregnancy, member_id: i64) -> CoreResult<()> {
    let member = owned_member(pool, pregnancy, member_id).await?;
    store::village::delete(pool, member.id).await?;
    tracing::info!(pregnancy_id = pregnancy.id, member_id, "village member removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::store::testing;

    fn member(email: &str) -> NewVillageMember {
        NewVillageMember {
            name: " Gran ".into(),
            email: email.into(),
            relationship: "grandmother".into(),
            is_told: false,
        }
    }

    async fn kinds(pool: &SqlitePool, pregnancy_id: i64) -> Vec<EventKind> {
        store::events::list_for_pregnancy(pool, pregnancy_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect()
    }

    #[tokio::test]
    async fn add_member_trims_and_records_join() {
        let pool = testing::pool().await;
        let (_, pregnancy) = testing::user_with_pregnancy(&pool, "a@x.com").await;

        let added = add_member(&pool, &pregnancy, &member("B@X.com"), JoinSource::Manual, Utc::now())
            .await
            .unwrap();
        assert_eq!(added.name, "Gran");
        assert_eq!(added.email, "b@x.com");
        assert!(!added.is_told);
        assert_eq!(kinds(&pool, pregnancy.id).await, vec![EventKind::VillagerJoined]);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let pool = testing::pool().await;
        let (_, pregnancy) = testing::user_with_pregnancy(&pool, "a@x.com").await;
        add_member(&pool, &pregnancy, &member("b@x.com"), JoinSource::Manual, Utc::now())
            .await
            .unwrap();
        let err = add_member(&pool, &pregnancy, &member("B@x.COM"), JoinSource::Manual, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let pool = testing::pool().await;
        let (_, pregnancy) = testing::user_with_pregnancy(&pool, "a@x.com").await;
        let mut blank = member("b@x.com");
        blank.relationship = "  ".into();
        let err = add_member(&pool, &pregnancy, &blank, JoinSource::Manual, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Missing("relationship"))));
    }

    #[tokio::test]
    async fn bulk_numbers_names_and_skips_duplicates() {
        let pool = testing::pool().await;
        let (_, pregnancy) = testing::user_with_pregnancy(&pool, "a@x.com").await;
        add_member(&pool, &pregnancy, &member("c@x.com"), JoinSource::Manual, Utc::now())
            .await
            .unwrap();

        let bulk = BulkMembers {
            name: "The Parkers".into(),
            emails: vec!["p1@x.com".into(), "c@x.com".into(), " ".into(), "p2@x.com".into()],
            relationship: "friends".into(),
            ..Default::default()
        };
        let outcome = add_members(&pool, &pregnancy, &bulk, JoinSource::Invite, Utc::now())
            .await
            .unwrap();
        let names: Vec<_> = outcome.created.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["The Parkers (1)", "The Parkers (3)"]);
        assert_eq!(outcome.skipped, vec!["c@x.com".to_string()]);
    }

    #[tokio::test]
    async fn told_event_only_on_false_to_true() {
        let pool = testing::pool().await;
        let (_, pregnancy) = testing::user_with_pregnancy(&pool, "a@x.com").await;
        let added = add_member(&pool, &pregnancy, &member("b@x.com"), JoinSource::Manual, Utc::now())
            .await
            .unwrap();

        let told = set_told(&pool, &pregnancy, added.id, true, Utc::now()).await.unwrap();
        assert!(told.is_told);
        assert!(told.told_date.is_some());
        set_told(&pool, &pregnancy, added.id, true, Utc::now()).await.unwrap();
        let untold = set_told(&pool, &pregnancy, added.id, false, Utc::now()).await.unwrap();
        assert!(untold.told_date.is_none());

        let told_events = kinds(&pool, pregnancy.id)
            .await
            .into_iter()
            .filter(|k| *k == EventKind::VillagerTold)
            .count();
        assert_eq!(told_events, 1);
    }

    #[tokio::test]
    async fn other_pregnancy_is_forbidden() {
        let pool = testing::pool().await;
        let (_, mine) = testing::user_with_pregnancy(&pool, "a@x.com").await;
        let (_, theirs) = testing::user_with_pregnancy(&pool, "c@x.com").await;
        let added = add_member(&pool, &theirs, &member("b@x.com"), JoinSource::Manual, Utc::now())
            .await
            .unwrap();

        assert!(matches!(
            set_told(&pool, &mine, added.id, true, Utc::now()).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(remove(&pool, &mine, added.id).await, Err(CoreError::Forbidden(_))));
        assert!(matches!(remove(&pool, &mine, 9_999).await, Err(CoreError::NotFound(_))));
        remove(&pool, &theirs, added.id).await.unwrap();
    }
}
