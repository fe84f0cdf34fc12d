//! End-to-end tests of the HTTP surface over the in-memory store.

use std::sync::Arc;

use api_lib::adapters::MemoryAdapter;
use api_lib::config::Config;
use api_lib::web::{self, state::AppState};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use library_core::{LibraryStore, Role, User};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    store: Arc<dyn LibraryStore>,
    admin: User,
    staff: User,
    member: User,
}

fn test_config(extra: &[(&str, &str)]) -> Config {
    let mut vars = vec![("STORAGE", "memory")];
    vars.extend_from_slice(extra);
    Config::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .unwrap()
}

async fn setup_with(extra: &[(&str, &str)]) -> TestApp {
    let store: Arc<dyn LibraryStore> = Arc::new(MemoryAdapter::new());
    let state = AppState::new(store.clone(), Arc::new(test_config(extra)), None, None);
    let admin = state
        .users
        .seed_user("admin@test.local", Some("Admin"), Role::Admin)
        .await
        .unwrap();
    let staff = state
        .users
        .seed_user("staff@test.local", Some("Staff"), Role::Staff)
        .await
        .unwrap();
    let member = state
        .users
        .seed_user("member@test.local", Some("Member"), Role::Member)
        .await
        .unwrap();
    TestApp {
        router: web::router(Arc::new(state)),
        store,
        admin,
        staff,
        member,
    }
}

async fn setup() -> TestApp {
    setup_with(&[]).await
}

impl TestApp {
    /// Opens a session for the user directly in the store and returns its cookie.
    async fn cookie_for(&self, user: &User) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.store
            .create_auth_session(&session_id, user.id, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        format!("session={}", session_id)
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Option<String>, Value) {
        self.send_raw(method, uri, cookie, body.map(|b| b.to_string())).await
    }

    /// Sends `body` verbatim as `application/json`, well-formed or not.
    async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Option<String>, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, set_cookie, json)
    }

    async fn create_book(&self, cookie: &str, title: &str) -> String {
        let (status, _, body) = self
            .send(
                "POST",
                "/books",
                Some(cookie),
                Some(json!({ "title": title, "author": "Herbert" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = setup().await;
    let (status, _, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = setup().await;
    let (status, _, body) = app.send("GET", "/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _, _) = app
        .send("GET", "/books", Some("session=not-a-session"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn member_delete_is_forbidden() {
    let app = setup().await;
    let staff = app.cookie_for(&app.staff).await;
    let member = app.cookie_for(&app.member).await;
    let id = app.create_book(&staff, "Dune").await;

    let (status, _, body) = app
        .send("DELETE", &format!("/books/{}", id), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _, body) = app
        .send("GET", &format!("/books/{}", id), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Dune");
}

#[tokio::test]
async fn checkout_conflict_is_reported_as_409() {
    let app = setup().await;
    let staff = app.cookie_for(&app.staff).await;
    let member = app.cookie_for(&app.member).await;
    let id = app.create_book(&staff, "Dune").await;

    let (status, _, loan) = app
        .send("POST", &format!("/books/{}/checkout", id), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", loan);
    assert_eq!(loan["borrower_id"], app.member.id.to_string());
    assert_eq!(loan["is_open"], true);

    let (status, _, body) = app
        .send("POST", &format!("/books/{}/checkout", id), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
    assert!(body["message"].as_str().unwrap().contains("not available"));

    let (status, _, body) = app
        .send("GET", &format!("/books/{}", id), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "BORROWED");

    let (status, _, body) = app
        .send("POST", &format!("/books/{}/checkin", id), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["checked_in_at"].is_string());

    let (status, _, body) = app.send("GET", "/me/loans", Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loans"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn staff_checkout_on_behalf_uses_the_body() {
    let app = setup().await;
    let staff = app.cookie_for(&app.staff).await;
    let id = app.create_book(&staff, "Dune").await;

    let (status, _, loan) = app
        .send(
            "POST",
            &format!("/books/{}/checkout", id),
            Some(&staff),
            Some(json!({ "borrower_id": app.member.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", loan);
    assert_eq!(loan["borrower_id"], app.member.id.to_string());

    let (status, _, body) = app
        .send("GET", &format!("/books/{}/loans", id), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loans"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_book_and_filter_are_bad_requests() {
    let app = setup().await;
    let staff = app.cookie_for(&app.staff).await;

    let (status, _, body) = app
        .send(
            "POST",
            "/books",
            Some(&staff),
            Some(json!({ "title": "", "author": "X" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let (status, _, body) = app
        .send("GET", "/books?status=LOST", Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn unknown_book_is_not_found() {
    let app = setup().await;
    let member = app.cookie_for(&app.member).await;
    let (status, _, body) = app
        .send(
            "POST",
            &format!("/books/{}/checkout", Uuid::new_v4()),
            Some(&member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn signup_login_and_logout() {
    let app = setup().await;

    let (status, cookie, body) = app
        .send(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "email": "New@Test.Local", "password": "long-enough", "name": "New" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["role"], "MEMBER");
    assert_eq!(body["email"], "new@test.local");
    let cookie = cookie.unwrap();
    let session = cookie.split(';').next().unwrap().to_string();
    assert!(cookie.contains("HttpOnly"));

    let (status, _, me) = app.send("GET", "/auth/me", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user_id"], body["user_id"]);

    let (status, _, body) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "new@test.local", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, cookie, _) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "new@test.local", "password": "long-enough" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(cookie.is_some());

    let (status, _, _) = app.send("POST", "/auth/logout", Some(&session), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = app.send("GET", "/auth/me", Some(&session), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_signup_conflicts_and_short_password_is_rejected() {
    let app = setup().await;
    let (status, _, body) = app
        .send(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "email": "member@test.local", "password": "long-enough" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, _, body) = app
        .send(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "email": "short@test.local", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn dev_login_only_when_enabled() {
    let app = setup().await;
    let (status, _, _) = app
        .send(
            "POST",
            "/auth/dev-login",
            None,
            Some(json!({ "email": "member@test.local" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let app = setup_with(&[("DEV_LOGIN_ENABLED", "true")]).await;
    let (status, cookie, body) = app
        .send(
            "POST",
            "/auth/dev-login",
            None,
            Some(json!({ "email": "member@test.local" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "MEMBER");
    assert!(cookie.is_some());
}

#[tokio::test]
async fn only_admins_manage_users() {
    let app = setup().await;
    let admin = app.cookie_for(&app.admin).await;
    let staff = app.cookie_for(&app.staff).await;

    let (status, _, _) = app.send("GET", "/admin/users", Some(&staff), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = app.send("GET", "/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 3);

    let uri = format!("/admin/users/{}/role", app.member.id);
    let (status, _, body) = app
        .send("PATCH", &uri, Some(&admin), Some(json!({ "role": "librarian" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "STAFF");

    let (status, _, body) = app
        .send("PATCH", &uri, Some(&admin), Some(json!({ "role": "owner" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn metadata_falls_back_without_a_model() {
    let app = setup().await;
    let staff = app.cookie_for(&app.staff).await;
    let member = app.cookie_for(&app.member).await;
    let request = json!({ "title": "The Hobbit", "author": "Tolkien" });

    let (status, _, _) = app
        .send("POST", "/ai/book-metadata", Some(&member), Some(request.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = app
        .send("POST", "/ai/book-metadata", Some(&staff), Some(request))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fallback");
    assert!(body["tags"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t.as_str() == Some("fantasy")));
}

#[tokio::test]
async fn malformed_requests_are_json_invalid_input() {
    let app = setup().await;
    let admin = app.cookie_for(&app.admin).await;
    let staff = app.cookie_for(&app.staff).await;
    let id = app.create_book(&staff, "Dune").await;

    let cases = [
        ("POST", "/books".to_string(), Some(json!({ "title": "Dune" }).to_string())),
        (
            "PUT",
            format!("/books/{}", id),
            Some(
                json!({ "title": "Dune", "author": "Herbert", "published_year": "1965" })
                    .to_string(),
            ),
        ),
        ("POST", "/books".to_string(), Some("{\"title\": ".to_string())),
        ("GET", "/books/not-a-uuid".to_string(), None),
        ("POST", "/books/not-a-uuid/checkout".to_string(), None),
        (
            "PATCH",
            format!("/admin/users/{}/role", app.member.id),
            Some(json!({ "role": 5 }).to_string()),
        ),
        (
            "POST",
            "/ai/book-metadata".to_string(),
            Some(json!({ "title": "Dune" }).to_string()),
        ),
    ];
    for (method, uri, body) in cases {
        let (status, _, body) = app.send_raw(method, &uri, Some(&admin), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}: {}", method, uri, body);
        assert_eq!(body["error"], "invalid_input", "{} {}", method, uri);
        assert!(body["message"].is_string());
    }

    let (status, _, body) = app
        .send_raw("POST", "/auth/login", None, Some("not json".to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let (status, _, body) = app
        .send("GET", &format!("/books/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Dune");
    assert_eq!(body["published_year"], Value::Null);
}

#[tokio::test]
async fn assistant_lists_recent_matches_without_a_model() {
    let app = setup().await;
    let staff = app.cookie_for(&app.staff).await;
    let member = app.cookie_for(&app.member).await;
    for n in 1..=6 {
        app.create_book(&staff, &format!("Dune {}", n)).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    app.create_book(&staff, "Emma").await;

    let (status, _, body) = app
        .send(
            "POST",
            "/ai/assistant",
            Some(&member),
            Some(json!({ "message": "  dune " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["source"], "fallback");
    assert_eq!(
        body["reply"],
        "I found 5 matching book(s): \"Dune 6\", \"Dune 5\", \"Dune 4\", \"Dune 3\", \"Dune 2\"."
    );
    assert_eq!(body["books"].as_array().unwrap().len(), 5);
    assert_eq!(body["books"][0]["title"], "Dune 6");

    let (status, _, body) = app
        .send(
            "POST",
            "/ai/assistant",
            Some(&member),
            Some(json!({ "message": "moby dick" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["reply"]
        .as_str()
        .unwrap()
        .starts_with("I couldn't find any matching books"));
    assert_eq!(body["books"], json!([]));
}

#[tokio::test]
async fn assistant_needs_a_session_and_a_message() {
    let app = setup().await;
    let member = app.cookie_for(&app.member).await;

    let (status, _, _) = app
        .send("POST", "/ai/assistant", None, Some(json!({ "message": "dune" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = app
        .send("POST", "/ai/assistant", Some(&member), Some(json!({ "message": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let (status, _, body) = app
        .send("POST", "/ai/assistant", Some(&member), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn seeded_accounts_without_a_password_use_dev_login() {
    let app = setup_with(&[("DEV_LOGIN_ENABLED", "true")]).await;
    let (status, cookie, body) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "admin@test.local", "password": "anything-long" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
    assert!(cookie.is_none());

    let (status, cookie, body) = app
        .send(
            "POST",
            "/auth/dev-login",
            None,
            Some(json!({ "email": "admin@test.local" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "ADMIN");
    assert!(cookie.is_some());
}
