//! HTTP request handlers.

use super::AppState;
use crate::catalog::Target;
use crate::probe::TargetStatus;
use crate::scheduler::{RunState, Scope, SchedulerError};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

fn scheduler_error(e: SchedulerError) -> Response {
    let status = match e {
        SchedulerError::AlreadyRunning => StatusCode::CONFLICT,
        SchedulerError::UnknownTarget(_) => StatusCode::NOT_FOUND,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

// ============================================================================
// API: Targets
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TargetView {
    #[serde(flatten)]
    pub target: Target,
    pub available: bool,
}

pub async fn handle_get_targets(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.scheduler.target_status().await;
    let targets: Vec<TargetView> = state
        .scheduler
        .registry()
        .targets()
        .iter()
        .map(|t| TargetView {
            target: t.clone(),
            available: status.get(&t.id).copied().unwrap_or(false),
        })
        .collect();

    Json(targets)
}

#[derive(Debug, Serialize)]
pub struct StateView {
    pub run_state: RunState,
    pub scope: Scope,
    pub target_status: TargetStatus,
}

async fn state_view(state: &AppState) -> StateView {
    StateView {
        run_state: state.scheduler.run_state().await,
        scope: state.scheduler.selected_scope().await,
        target_status: state.scheduler.target_status().await,
    }
}

pub async fn handle_refresh_targets(State(state): State<AppState>) -> impl IntoResponse {
    state.scheduler.refresh_availability().await;
    Json(state_view(&state).await)
}

// ============================================================================
// API: Probes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ProbesQuery {
    #[serde(default)]
    pub target: Option<String>,
}

pub async fn handle_get_probes(
    State(state): State<AppState>,
    Query(query): Query<ProbesQuery>,
) -> impl IntoResponse {
    let registry = state.scheduler.registry();

    if let Some(target) = &query.target {
        if registry.target(target).is_none() {
            return scheduler_error(SchedulerError::UnknownTarget(target.clone()));
        }
    }

    let probes: Vec<_> = registry
        .list_probes(query.target.as_deref())
        .into_iter()
        .cloned()
        .collect();

    Json(probes).into_response()
}

pub async fn handle_run_probe(
    State(state): State<AppState>,
    Path((target, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let descriptor = match state.scheduler.registry().find_probe(&target, &name) {
        Some(d) => d.clone(),
        None => return (StatusCode::NOT_FOUND, "Probe not found").into_response(),
    };

    let result = state.scheduler.run_single_probe(&descriptor).await;
    Json(result).into_response()
}

// ============================================================================
// API: Runs
// ============================================================================

pub async fn handle_get_state(State(state): State<AppState>) -> impl IntoResponse {
    Json(state_view(&state).await)
}

#[derive(Debug, Deserialize)]
pub struct ScopeRequest {
    pub scope: String,
}

pub async fn handle_select_scope(
    State(state): State<AppState>,
    Json(req): Json<ScopeRequest>,
) -> impl IntoResponse {
    match state.scheduler.select_scope(Scope::from(req.scope.as_str())).await {
        Ok(()) => Json(state_view(&state).await).into_response(),
        Err(e) => scheduler_error(e),
    }
}

/// Body of `POST /api/runs`. The body itself is optional.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    /// Defaults to the selected scope.
    #[serde(default)]
    pub scope: Option<String>,
}

pub async fn handle_start_run(
    State(state): State<AppState>,
    req: Option<Json<RunRequest>>,
) -> impl IntoResponse {
    let req = req.map(|Json(req)| req).unwrap_or_default();
    let scope = match req.scope {
        Some(s) => Scope::from(s.as_str()),
        None => state.scheduler.selected_scope().await,
    };

    // The run continues in the background; clients poll /api/state.
    match state.scheduler.start_run(scope.clone()).await {
        Ok(_) => (StatusCode::ACCEPTED, Json(json!({ "scope": scope }))).into_response(),
        Err(e) => scheduler_error(e),
    }
}

pub async fn handle_abort_run(State(state): State<AppState>) -> impl IntoResponse {
    let aborted = state.scheduler.abort_run().await;
    Json(json!({ "aborted": aborted }))
}

// ============================================================================
// API: Results
// ============================================================================

pub async fn handle_get_results(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.results().await)
}

pub async fn handle_clear_results(State(state): State<AppState>) -> impl IntoResponse {
    state.scheduler.clear_results().await;
    StatusCode::NO_CONTENT
}

pub async fn handle_get_summary(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.summary().await)
}

#[cfg(test)]
mod tests {
    use super::super::router;
    use super::*;
    use crate::catalog::{CatalogFile, Registry};
    use crate::probe::{build_client, AvailabilityChecker, Executor};
    use crate::scheduler::Scheduler;
    use crate::testutil::{demo_backend, spawn_backend, target_spec};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    /// Start a backend plus the harness API in front of it; returns the API base URL.
    async fn spawn_api(probe_timeout: Duration) -> String {
        let backend = spawn_backend(demo_backend()).await;
        let catalog = CatalogFile {
            targets: vec![target_spec(
                "svc1",
                &backend,
                &[("Health Check", "/health"), ("Ping", "/ping"), ("Slow", "/slow")],
            )],
        };
        let client = build_client().unwrap();
        let scheduler = Arc::new(Scheduler::new(
            Arc::new(Registry::from_catalog(catalog).unwrap()),
            Executor::new(client.clone(), probe_timeout),
            AvailabilityChecker::new(client, Duration::from_secs(1)),
            Duration::ZERO,
        ));
        spawn_backend(router(AppState { scheduler })).await
    }

    async fn wait_idle(client: &reqwest::Client, api: &str) {
        for _ in 0..500 {
            let state: Value = client
                .get(format!("{}/api/state", api))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if state["run_state"] == "idle" {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run did not finish");
    }

    #[tokio::test]
    async fn test_targets_and_refresh() {
        let api = spawn_api(Duration::from_secs(5)).await;
        let client = reqwest::Client::new();

        let targets: Value = client
            .get(format!("{}/api/targets", api))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(targets[0]["id"], "svc1");
        assert_eq!(targets[0]["available"], false);

        let state: Value = client
            .post(format!("{}/api/targets/refresh", api))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(state["target_status"]["svc1"], true);
        assert_eq!(state["scope"], "all");
    }

    #[tokio::test]
    async fn test_run_lifecycle() {
        let api = spawn_api(Duration::from_millis(200)).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/api/runs", api))
            .json(&json!({ "scope": "svc1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);

        let again = client
            .post(format!("{}/api/runs", api))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(again.status(), reqwest::StatusCode::CONFLICT);

        wait_idle(&client, &api).await;

        let summary: Value = client
            .get(format!("{}/api/summary", api))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(summary["total"], 3);
        assert_eq!(summary["success_count"], 2);
        assert_eq!(summary["error_count"], 1);

        let results: Value = client
            .get(format!("{}/api/results", api))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(results[0]["probe_name"], "Slow");
        assert_eq!(results[0]["error_kind"], "timeout");

        let cleared = client
            .delete(format!("{}/api/results", api))
            .send()
            .await
            .unwrap();
        assert_eq!(cleared.status(), reqwest::StatusCode::NO_CONTENT);

        let results: Value = client
            .get(format!("{}/api/results", api))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(results, json!([]));
    }

    #[tokio::test]
    async fn test_run_without_body_uses_selected_scope() {
        let api = spawn_api(Duration::from_millis(200)).await;
        let client = reqwest::Client::new();

        client
            .put(format!("{}/api/scope", api))
            .json(&json!({ "scope": "svc1" }))
            .send()
            .await
            .unwrap();

        let resp = client
            .post(format!("{}/api/runs", api))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["scope"], "svc1");

        wait_idle(&client, &api).await;
    }

    #[tokio::test]
    async fn test_unknown_scope_and_probe() {
        let api = spawn_api(Duration::from_secs(5)).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/api/runs", api))
            .json(&json!({ "scope": "nope" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        let resp = client
            .put(format!("{}/api/scope", api))
            .json(&json!({ "scope": "nope" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        let resp = client
            .post(format!("{}/api/probes/svc1/Missing/run", api))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        let resp = client
            .get(format!("{}/api/probes?target=nope", api))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_single_probe_and_listing() {
        let api = spawn_api(Duration::from_secs(5)).await;
        let client = reqwest::Client::new();

        let probes: Value = client
            .get(format!("{}/api/probes?target=svc1", api))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(probes.as_array().unwrap().len(), 3);
        assert_eq!(probes[0]["name"], "Health Check");
        assert_eq!(probes[0]["endpoint"]["method"], "GET");

        let result: Value = client
            .post(format!("{}/api/probes/svc1/Health%20Check/run", api))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(result["state"], "success");
        assert_eq!(result["payload"]["status"], "healthy");

        let state: Value = client
            .put(format!("{}/api/scope", api))
            .json(&json!({ "scope": "svc1" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(state["scope"], "svc1");
        assert_eq!(state["run_state"], "idle");

        let aborted: Value = client
            .post(format!("{}/api/runs/abort", api))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(aborted["aborted"], false);
    }
}
