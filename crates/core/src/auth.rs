//! Password hashing and session tokens.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{CoreError, CoreResult};
use crate::models::User;
use crate::store;
use crate::validate;

/// Lifetime of an issued token.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub name: String,
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::PasswordHash(e.to_string()))
}

/// Check a password against a stored PHC hash. A malformed hash never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            tracing::warn!(error = %err, "stored password hash is malformed");
            false
        }
    }
}

/// Issues and checks HS256 tokens with one shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user: &User) -> CoreResult<String> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user.id,
            name: user.name.clone(),
            is_admin: user.is_admin,
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Validate signature and expiry.
    pub fn verify(&self, token: &str) -> CoreResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Create an account. Emails are stored lower-cased; duplicates conflict.
#[tracing::instrument(name = "auth.register", skip_all)]
pub async fn register(pool: &SqlitePool, form: &Registration) -> CoreResult<User> {
    let name = validate::required("name", &form.name)?;
    let email = validate::email("email", &form.email)?;
    let password = validate::required("password", &form.password)?;

    let hash = hash_password(&password)?;
    let user = store::users::insert(pool, &name, &email, &hash).await?;
    tracing::info!(user_id = user.id, "user registered");
    Ok(user)
}

/// Check credentials. Unknown emails and wrong passwords look the same.
pub async fn login(pool: &SqlitePool, credentials: &Credentials) -> CoreResult<User> {
    let email = credentials.email.trim().to_lowercase();
    let user = store::users::find_by_email(pool, &email)
        .await?
        .ok_or(CoreError::InvalidCredentials)?;
    if !verify_password(&credentials.password, &user.password_hash) {
        return Err(CoreError::InvalidCredentials);
    }
    Ok(user)
}
