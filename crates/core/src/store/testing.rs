//! Fixtures shared by repository and service tests.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::models::{NewPregnancy, Pregnancy, User};
use crate::store;

pub async fn pool() -> SqlitePool {
    let pool = store::connect("sqlite::memory:", 1).await.unwrap();
    store::migrate(&pool).await.unwrap();
    pool
}

pub async fn user(pool: &SqlitePool, email: &str) -> User {
    store::users::insert(pool, "Sam Lee", email, "not-a-real-hash")
        .await
        .unwrap()
}

pub fn new_pregnancy(due: &str) -> NewPregnancy {
    NewPregnancy {
        due_date: NaiveDate::parse_from_str(due, "%Y-%m-%d").unwrap(),
        conception_date: None,
        partner_name: Some("Alex Kim".into()),
        partner_email: Some("Alex@Example.com".into()),
        baby_name: None,
    }
}

pub async fn user_with_pregnancy(pool: &SqlitePool, email: &str) -> (User, Pregnancy) {
    let user = user(pool, email).await;
    let share_id = format!("share-{}", user.id);
    let pregnancy = store::pregnancies::create_with_milestones(
        pool,
        user.id,
        &new_pregnancy("2025-06-01"),
        &share_id,
    )
    .await
    .unwrap();
    (user, pregnancy)
}
