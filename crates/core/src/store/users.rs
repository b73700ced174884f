use sqlx::SqlitePool;

use crate::error::{CoreError, CoreResult};
use crate::models::User;

#[tracing::instrument(name = "store.users.insert", skip(pool, password_hash))]
pub async fn insert(pool: &SqlitePool, name: &str, email: &str, password_hash: &str) -> CoreResult<User> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?) RETURNING *",
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| CoreError::conflict_on_unique(e, "a user with this email already exists"))
}

#[tracing::instrument(name = "store.users.find_by_email", skip(pool))]
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> CoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER(?)")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> CoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Like [`find_by_id`] but a missing user is an error.
pub async fn get(pool: &SqlitePool, id: i64) -> CoreResult<User> {
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| CoreError::NotFound("user not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing;

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let pool = testing::pool().await;
        insert(&pool, "Sam", "a@x.com", "h").await.unwrap();
        let err = insert(&pool, "Other", "a@x.com", "h").await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn find_by_email_ignores_case() {
        let pool = testing::pool().await;
        let user = insert(&pool, "Sam", "a@x.com", "h").await.unwrap();
        let found = find_by_email(&pool, "A@X.COM").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(!found.is_admin);
    }
}
