//! Who may see a shared timeline, and the request/approve workflow for
//! everyone else.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{CoreError, CoreResult};
use crate::events::{self, JoinSource, NewEvent};
use crate::models::{AccessRequest, AccessRequestStatus, NewAccessRequest, Pregnancy, VillageMember};
use crate::store;
use crate::store::village::MemberRow;
use crate::validate::{self, ValidationError};

/// True when `email` is the owner's, the partner's or any member's address.
/// Comparison ignores case and surrounding whitespace.
pub fn has_access<'a>(
    owner_email: &str,
    pregnancy: &Pregnancy,
    member_emails: impl IntoIterator<Item = &'a str>,
    email: &str,
) -> bool {
    let email = email.trim();
    if email.is_empty() {
        return false;
    }
    let matches = |candidate: &str| candidate.trim().eq_ignore_ascii_case(email);

    matches(owner_email)
        || pregnancy.partner_email.as_deref().is_some_and(matches)
        || member_emails.into_iter().any(matches)
}

pub async fn verify(pool: &SqlitePool, pregnancy: &Pregnancy, email: &str) -> CoreResult<bool> {
    let owner = store::users::get(pool, pregnancy.user_id).await?;
    let members = store::village::list(pool, pregnancy.id).await?;
    Ok(has_access(
        &owner.email,
        pregnancy,
        members.iter().map(|m| m.email.as_str()),
        email,
    ))
}

/// File a pending request. Existing members and duplicate pending requests
/// are conflicts.
#[tracing::instrument(name = "access.submit", skip(pool, pregnancy, new), fields(pregnancy_id = pregnancy.id))]
pub async fn submit(pool: &SqlitePool, pregnancy: &Pregnancy, new: &NewAccessRequest) -> CoreResult<AccessRequest> {
    let email = validate::email("email", &new.email)?;
    let name = validate::required("name", &new.name)?;
    let relationship = validate::required("relationship", &new.relationship)?;
    let message = validate::optional(new.message.as_deref());

    if store::village::exists_with_email(pool, pregnancy.id, &email).await? {
        return Err(CoreError::Conflict("you are already a member of this village".into()));
    }
    if store::access_requests::has_pending(pool, pregnancy.id, &email).await? {
        return Err(CoreError::Conflict("an access request for this email is already pending".into()));
    }

    store::access_requests::insert(pool, pregnancy.id, &email, &name, &relationship, message.as_deref()).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Deny,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Deny => "deny",
        }
    }

    fn status(&self) -> AccessRequestStatus {
        match self {
            Decision::Approve => AccessRequestStatus::Approved,
            Decision::Deny => AccessRequestStatus::Denied,
        }
    }
}

impl FromStr for Decision {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Decision::Approve),
            "deny" => Ok(Decision::Deny),
            other => Err(ValidationError::Invalid {
                field: "action",
                reason: format!("unknown action '{other}', expected approve or deny"),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub decision: Decision,
    pub request: AccessRequest,
    /// Set when the request was approved.
    pub member: Option<VillageMember>,
    pub pregnancy: Pregnancy,
}

/// Approve or deny a pending request owned by `owner_id`.
///
/// Approval inserts the member (already told) and marks the request in one
/// transaction. The resolved row is deleted afterwards; a failed delete only
/// leaves a non-pending row behind.
#[tracing::instrument(name = "access.resolve", skip(pool))]
pub async fn resolve(
    pool: &SqlitePool,
    owner_id: i64,
    request_id: i64,
    decision: Decision,
    now: DateTime<Utc>,
) -> CoreResult<Resolution> {
    let request = store::access_requests::find_pending(pool, request_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("access request not found".into()))?;
    let pregnancy = store::pregnancies::find_active_by_id(pool, request.pregnancy_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("access request not found".into()))?;
    if pregnancy.user_id != owner_id {
        return Err(CoreError::Forbidden("access request belongs to another pregnancy".into()));
    }

    let member = match decision {
        Decision::Approve => {
            let mut tx = pool.begin().await?;
            let row = MemberRow {
                name: &request.name,
                email: &request.email,
                relationship: &request.relationship,
                is_told: true,
            };
            let member = store::village::insert(&mut *tx, pregnancy.id, &row).await?;
            if !store::access_requests::resolve(&mut *tx, request.id, decision.status()).await? {
                return Err(CoreError::NotFound("access request not found".into()));
            }
            tx.commit().await?;

            events::emit(
                pool,
                pregnancy.id,
                NewEvent::villager_joined(
                    JoinSource::AccessRequest,
                    &member.name,
                    &member.relationship,
                    Some(pregnancy.current_week(now)),
                    owner_id,
                ),
            )
            .await;
            Some(member)
        }
        Decision::Deny => {
            if !store::access_requests::resolve(pool, request.id, decision.status()).await? {
                return Err(CoreError::NotFound("access request not found".into()));
            }
            None
        }
    };

    if let Err(err) = store::access_requests::delete(pool, request.id).await {
        tracing::warn!(request_id = request.id, error = %err, "failed to delete resolved access request");
    }
    tracing::info!(request_id = request.id, action = decision.as_str(), "access request resolved");

    Ok(Resolution {
        decision,
        request,
        member,
        pregnancy,
    })
}
