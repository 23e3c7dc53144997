use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Extension, Router,
};
use clubbee::repo::{DemoRepository, SharedRepo};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub fn app() -> Router {
    let repo: SharedRepo = Arc::new(DemoRepository::seeded());
    clubbee::app().layer(Extension(repo))
}

pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
