use chrono::{NaiveDate, Utc};
use fortyweeks_api::{app, build_state, AppConfig};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;

struct TestApp {
    base: String,
    client: reqwest::Client,
    pool: SqlitePool,
    _media: TempDir,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap()
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    /// Register, log in, and return the token.
    async fn signup(&self, name: &str, email: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/register"))
            .json(&json!({ "name": name, "email": email, "password": "pw123456" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        self.login(email).await
    }

    async fn login(&self, email: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/login"))
            .json(&json!({ "email": email, "password": "pw123456" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Signed-up owner with a pregnancy due 2025-06-01.
    async fn owner(&self, email: &str) -> (String, Value) {
        let token = self.signup("Sam Lee", email).await;
        let resp = self
            .post(
                "/api/pregnancy",
                &token,
                json!({ "due_date": "2025-06-01", "partner_name": "Alex Kim" }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        (token, resp.json().await.unwrap())
    }
}

async fn spawn_app() -> TestApp {
    let media = TempDir::new().unwrap();
    let config = AppConfig {
        database_url: "sqlite::memory:".to_string(),
        images_dir: media.path().join("images"),
        videos_dir: media.path().join("videos"),
        jwt_secret: "test-secret".to_string(),
        ..AppConfig::default()
    };
    let (state, _worker) = build_state(config).await.unwrap();
    let pool = state.pool().clone();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });

    TestApp {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        pool,
        _media: media,
    }
}

#[tokio::test]
async fn health_reports_database() {
    let app = spawn_app().await;
    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["email"], "log");
}

#[tokio::test]
async fn register_login_and_track_village() {
    let app = spawn_app().await;
    let token = app.signup("Sam Lee", "a@x.com").await;

    let resp = app
        .post("/api/pregnancy", &token, json!({ "due_date": "2025-06-01" }))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app.get("/api/pregnancy/current", &token).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let pregnancy: Value = resp.json().await.unwrap();
    let due = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let expected = fortyweeks_core::week::current_week(Utc::now(), None, due);
    assert_eq!(pregnancy["current_week"], expected);
    assert_eq!(pregnancy["baby_name"], "Baby");

    let resp = app
        .post(
            "/api/village-members",
            &token,
            json!({ "name": "Bea", "email": "b@x.com", "relationship": "sister" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let member: Value = resp.json().await.unwrap();

    let members: Vec<Value> = app
        .get("/api/village-members", &token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["is_told"], false);

    let resp = app
        .put(
            &format!("/api/village-members/{}", member["id"]),
            &token,
            json!({ "is_told": true }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let told: Value = resp.json().await.unwrap();
    assert_eq!(told["is_told"], true);
    assert!(told["told_date"].is_string());

    let timeline: Value = app.get("/api/timeline", &token).await.json().await.unwrap();
    let kinds: Vec<&str> = timeline["events"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["event_type"].as_str())
        .collect();
    assert!(kinds.contains(&"villager_told"));
    assert!(kinds.contains(&"villager_joined"));
    assert!(kinds.contains(&"pregnancy_announced"));
    assert_eq!(timeline["total"], 3);
}

#[tokio::test]
async fn requests_without_a_valid_token_are_rejected() {
    let app = spawn_app().await;

    let resp = app.client.get(app.url("/api/pregnancy")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.get("/api/pregnancy", "not-a-token").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["statusCode"], 401);

    let resp = app
        .client
        .post(app.url("/api/login"))
        .json(&json!({ "email": "nobody@x.com", "password": "pw123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registrations_and_pregnancies_conflict() {
    let app = spawn_app().await;
    let (token, _) = app.owner("a@x.com").await;

    let resp = app
        .client
        .post(app.url("/api/register"))
        .json(&json!({ "name": "Sam", "email": "A@X.com", "password": "pw123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .post("/api/pregnancy", &token, json!({ "due_date": "2025-07-01" }))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .post("/api/pregnancy", &token, json!({ "due_date": "July 1st" }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_member_and_pending_request_conflict() {
    let app = spawn_app().await;
    let (token, pregnancy) = app.owner("a@x.com").await;
    let share_id = pregnancy["share_id"].as_str().unwrap();

    let member = json!({ "name": "Bea", "email": "b@x.com", "relationship": "sister" });
    assert_eq!(
        app.post("/api/village-members", &token, member.clone()).await.status(),
        StatusCode::CREATED
    );
    assert_eq!(
        app.post("/api/village-members", &token, member).await.status(),
        StatusCode::CONFLICT
    );

    let request = json!({ "email": "jo@x.com", "name": "Jo", "relationship": "cousin" });
    let path = format!("/api/timeline/{share_id}/request-access");
    let resp = app.client.post(app.url(&path)).json(&request).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app.client.post(app.url(&path)).json(&request).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let existing = json!({ "email": "B@x.com", "name": "Bea", "relationship": "sister" });
    let resp = app.client.post(app.url(&path)).json(&existing).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn approved_request_becomes_a_told_member() {
    let app = spawn_app().await;
    let (token, pregnancy) = app.owner("a@x.com").await;
    let share_id = pregnancy["share_id"].as_str().unwrap();

    let resp = app
        .client
        .post(app.url(&format!("/api/timeline/{share_id}/request-access")))
        .json(&json!({ "email": "jo@x.com", "name": "Jo", "relationship": "cousin", "message": "hi!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let pending: Vec<Value> = app
        .get("/api/village-members/access-requests", &token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    let id = &pending[0]["id"];

    let resp = app
        .post(&format!("/api/village-members/access-requests/{id}/maybe"), &token, json!({}))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .post(&format!("/api/village-members/access-requests/{id}/approve"), &token, json!({}))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["action"], "approve");
    assert_eq!(body["message"], "Request approved successfully");

    let members: Vec<Value> = app
        .get("/api/village-members", &token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["email"], "jo@x.com");
    assert_eq!(members[0]["is_told"], true);

    let pending: Vec<Value> = app
        .get("/api/village-members/access-requests", &token)
        .await
        .json()
        .await
        .unwrap();
    assert!(pending.is_empty());

    let resp = app
        .post(&format!("/api/village-members/access-requests/{id}/deny"), &token, json!({}))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .client
        .post(app.url(&format!("/api/timeline/{share_id}/verify-access")))
        .json(&json!({ "email": "JO@x.com" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["has_access"], true);
}

#[tokio::test]
async fn invite_link_join_flow() {
    let app = spawn_app().await;
    let (token, _) = app.owner("a@x.com").await;

    let invite: Value = app
        .get("/api/pregnancy/invite-hash", &token)
        .await
        .json()
        .await
        .unwrap();
    let hash = invite["invite_hash"].as_str().unwrap().to_string();
    assert_eq!(hash.len(), 8);

    let info: Value = app
        .client
        .get(app.url(&format!("/api/pregnancy/invite/{hash}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["parent_names"], "Sam Lee & Alex Kim");
    assert_eq!(info["due_date"], "2025-06-01");

    let join = json!({
        "name": "The Smiths",
        "emails": ["s1@x.com", "s2@x.com"],
        "relationship": "friends",
    });
    let path = format!("/api/pregnancy/join/{hash}");
    let resp = app.client.post(app.url(&path)).json(&join).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["created"].as_array().unwrap().len(), 2);
    assert_eq!(body["created"][0]["name"], "The Smiths (1)");

    let resp = app.client.post(app.url(&path)).json(&join).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["created"].as_array().unwrap().is_empty());
    assert_eq!(body["skipped"], json!(["s1@x.com", "s2@x.com"]));

    let resp = app
        .client
        .get(app.url("/api/pregnancy/invite/zzzzzzzz"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_timeline_only_shows_shared_updates() {
    let app = spawn_app().await;
    let (token, pregnancy) = app.owner("a@x.com").await;
    let share_id = pregnancy["share_id"].as_str().unwrap();

    for (title, shared) in [("Shared scan", true), ("Private note", false)] {
        let resp = app
            .post("/api/updates", &token, json!({ "title": title, "is_shared": shared }))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = app
        .client
        .get(app.url(&format!("/timeline/{share_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .client
        .get(app.url(&format!("/timeline/{share_id}?email=stranger@x.com")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .client
        .get(app.url(&format!("/timeline/{share_id}?email=A@X.COM")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let titles: Vec<&str> = body["updates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Shared scan"]);
    assert_eq!(body["total"], 1);
    assert_eq!(body["pregnancy"]["parent_names"], "Sam & Alex");

    let resp = app
        .client
        .get(app.url(&format!("/timeline/{share_id}?email=a@x.com&limit=1&offset=1")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["updates"].as_array().unwrap().len(), 0);
    assert_eq!(body["total"], 1);

    let resp = app
        .client
        .get(app.url("/timeline/unknown?email=a@x.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let page = app
        .client
        .get(app.url(&format!("/view/{share_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    assert!(page.text().await.unwrap().contains("og:title"));
}

#[tokio::test]
async fn multipart_update_stores_and_serves_photos() {
    let app = spawn_app().await;
    let (token, pregnancy) = app.owner("a@x.com").await;

    let form = Form::new()
        .text("data", json!({ "title": "Bump photo" }).to_string())
        .part("photos", Part::bytes(b"fake-jpeg".to_vec()).file_name("bump.JPG"));
    let resp = app
        .client
        .post(app.url("/api/updates"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let update: Value = resp.json().await.unwrap();
    let photo = &update["photos"][0];
    assert_eq!(photo["original_filename"], "bump.JPG");
    assert_eq!(photo["sort_order"], 0);

    let path = format!("/images/{}/{}", pregnancy["id"], photo["filename"].as_str().unwrap());
    let resp = app.client.get(app.url(&path)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "image/jpeg");
    assert_eq!(
        resp.headers()["cache-control"],
        "public, max-age=31536000, immutable"
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"fake-jpeg");

    let form = Form::new()
        .text("data", json!({ "title": "Kicks" }).to_string())
        .part("videos", Part::bytes(b"fake".to_vec()).file_name("kicks.avi"));
    let resp = app
        .client
        .post(app.url("/api/updates"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let updates: Vec<Value> = app.get("/api/updates", &token).await.json().await.unwrap();
    assert_eq!(updates.len(), 1);

    let resp = app
        .client
        .delete(app.url(&format!("/api/updates/{}", update["id"])))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = app.client.get(app.url(&path)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sharing_an_update_notifies_subscribed_members() {
    let app = spawn_app().await;
    let (token, _) = app.owner("a@x.com").await;
    app.post(
        "/api/village-members",
        &token,
        json!({ "name": "Bea", "email": "b@x.com", "relationship": "sister" }),
    )
    .await;

    let update: Value = app
        .post("/api/updates", &token, json!({ "title": "Heartbeat" }))
        .await
        .json()
        .await
        .unwrap();
    let resp = app
        .put(
            &format!("/api/updates/{}/share", update["id"]),
            &token,
            json!({ "is_shared": true }),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "success": true, "is_shared": true }));

    let mut rows = Vec::new();
    for _ in 0..50 {
        rows = app
            .get("/api/email/notifications", &token)
            .await
            .json::<Vec<Value>>()
            .await
            .unwrap();
        if !rows.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["recipient_email"], "b@x.com");
    assert_eq!(rows[0]["email_type"], "update");
    assert_eq!(rows[0]["delivery_status"], "logged");

    let stats: Value = app.get("/api/email/stats", &token).await.json().await.unwrap();
    assert_eq!(stats["total_sent"], 1);
}

#[tokio::test]
async fn email_admin_endpoints_require_admin() {
    let app = spawn_app().await;
    let token = app.signup("Sam Lee", "a@x.com").await;

    let resp = app
        .post("/api/email/test", &token, json!({ "to_email": "t@x.com" }))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    sqlx::query("UPDATE users SET is_admin = TRUE WHERE email = 'a@x.com'")
        .execute(&app.pool)
        .await
        .unwrap();
    let admin = app.login("a@x.com").await;

    let resp = app
        .post("/api/email/test", &admin, json!({ "to_email": "t@x.com" }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    let resp = app.get("/api/email/config-test", &admin).await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}

