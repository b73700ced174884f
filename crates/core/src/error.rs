use thiserror::Error;

use crate::invite::InviteError;
use crate::mail::MailError;
use crate::media::MediaError;
use crate::validate::ValidationError;

/// Errors produced by domain operations and repositories.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Invite(#[from] InviteError),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Map a unique-constraint violation to `Conflict`, leaving other errors as-is.
    pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CoreError::Conflict(message.to_string())
            }
            _ => CoreError::Database(err),
        }
    }
}
