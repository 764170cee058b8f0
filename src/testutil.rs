//! Throwaway backends for tests.

use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::catalog::{Endpoint, ProbeDescriptor, ProbeSpec, TargetSpec};

/// Serve a router on an ephemeral local port and return its base URL.
pub async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL of a local port with nothing listening on it.
pub async fn unreachable_base() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// A backend with one route per probe outcome.
pub fn demo_backend() -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "healthy" })) }))
        .route("/ping", get(|| async { Json(json!({ "pong": true })) }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({ "late": true }))
            }),
        )
        .route(
            "/broken",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance") }),
        )
        .route("/text", get(|| async { "plain text, not json" }))
        .route("/empty", get(|| async { StatusCode::NO_CONTENT }))
        .route(
            "/echo",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let key = headers
                    .get("x-api-key")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Json(json!({ "key": key, "body": body }))
            }),
        )
}

pub fn descriptor(target: &str, name: &str, url: &str) -> ProbeDescriptor {
    ProbeDescriptor {
        name: name.to_string(),
        target: target.to_string(),
        endpoint: Endpoint::get(url),
        description: String::new(),
        headers: Default::default(),
        body: None,
    }
}

/// A catalog target whose probes are `(name, path)` pairs.
pub fn target_spec(id: &str, base_url: &str, probes: &[(&str, &str)]) -> TargetSpec {
    TargetSpec {
        id: id.to_string(),
        name: id.to_uppercase(),
        base_url: base_url.to_string(),
        health_path: "/health".to_string(),
        probes: probes
            .iter()
            .map(|(name, path)| ProbeSpec {
                name: name.to_string(),
                path: path.to_string(),
                description: String::new(),
                method: "GET".to_string(),
                headers: Default::default(),
                body: None,
            })
            .collect(),
    }
}
