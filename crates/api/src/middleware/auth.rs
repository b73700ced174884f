//! Bearer-token principals.
//!
//! Handlers that need a signed-in user take [`AuthUser`] (or [`AdminUser`])
//! as an argument; the claims are checked before the handler runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use fortyweeks_core::auth::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// The user named by a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub name: String,
    pub is_admin: bool,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            name: claims.name,
            is_admin: claims.is_admin,
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::Unauthorized("Authorization header required".to_string()))?;

        let claims = state.tokens().verify(bearer.token()).map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            ApiError::Unauthorized("Invalid token".to_string())
        })?;
        Ok(claims.into())
    }
}

/// An [`AuthUser`] with the admin flag set.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}
