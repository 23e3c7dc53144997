//! Router behaviour with signed tokens (`JWT_SECRET` set).

mod common;

use axum::{
    http::{Method, StatusCode},
    Router,
};
use clubbee::{auth, roles::Role};
use serde_json::{json, Value};
use std::{sync::Once, time::Duration};

const SECRET: &str = "Y2x1YmJlZS10ZXN0LXNlY3JldC0wMTIzNDU2Nzg5YWI=";

fn app() -> Router {
    static SIGNED: Once = Once::new();
    SIGNED.call_once(|| std::env::set_var("JWT_SECRET", SECRET));
    assert!(!auth::development_mode());
    common::app()
}

fn token(uid: &str, role: Role) -> String {
    auth::generate_jwt(
        uid,
        &format!("{uid}@example.com"),
        uid,
        role,
        Duration::from_secs(600),
    )
    .unwrap()
    .unwrap()
}

async fn call(app: &Router, method: Method, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
    common::request(app, method, uri, Some(token), body).await
}

#[tokio::test]
async fn forged_tokens_are_rejected() {
    let app = app();
    let (status, err) = call(&app, Method::PUT, "/api/clubs/1/join", "not-a-jwt", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["message"], "Invalid token");
}

#[tokio::test]
async fn auth_takes_identity_from_the_token() {
    let app = app();
    let alice = token("alice", Role::Student);
    let body = json!({ "uid": "victim", "email": "victim@example.com", "displayName": "Alice" });

    let (status, user) = call(&app, Method::POST, "/api/users/auth", &alice, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["id"], "alice");
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["role"], "student");
    assert!(!user["permissions"].as_array().unwrap().contains(&json!("create_news")));

    let session = user["token"].as_str().unwrap().to_string();
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/news",
        &session,
        Some(json!({ "title": "Hi", "content": "Body" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::GET, "/api/users/victim", &alice, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registration_only_assigns_roles_for_user_managers() {
    let app = app();
    let body = json!({ "name": "Mallory", "email": "mallory@example.com", "role": "super_admin" });

    let (status, user) = common::request(&app, Method::POST, "/api/users", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["role"], "student");

    let root = token("root", Role::SuperAdmin);
    let body = json!({ "name": "Ada", "email": "ada@example.com", "role": "admin" });
    let (status, user) = call(&app, Method::POST, "/api/users", &root, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["role"], "admin");
}

#[tokio::test]
async fn students_cannot_change_other_users_rosters() {
    let app = app();
    let victim = token("victim", Role::Student);
    let eve = token("eve", Role::Student);
    let admin = token("admin", Role::Admin);

    let (status, _) = call(
        &app,
        Method::PUT,
        "/api/events/2/rsvp",
        &victim,
        Some(json!({ "action": "rsvp" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let cancel_victim = json!({ "action": "cancel", "userId": "victim" });
    let (status, _) = call(&app, Method::PUT, "/api/events/2/rsvp", &eve, Some(cancel_victim.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, event) = common::request(&app, Method::GET, "/api/events/2", None, None).await;
    assert_eq!(event["attendees"][0]["userId"], "victim");

    let (status, _) = call(
        &app,
        Method::PUT,
        "/api/clubs/1/join",
        &eve,
        Some(json!({ "userId": "victim" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, club) = call(&app, Method::PUT, "/api/clubs/1/join", &eve, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(club["members"][0]["userId"], "eve");
    assert_eq!(club["members"][0]["displayName"], "eve");

    let (status, event) = call(&app, Method::PUT, "/api/events/2/rsvp", &admin, Some(cancel_victim)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(event["attendees"].as_array().unwrap().is_empty());
}
