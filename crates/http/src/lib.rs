// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]

//! The dashboard's JSON API: a thin axum router over [`rooster_daemon::Manager`].
//! Logical failures (unknown uuid, conflicting mutation, bad cron spec) are
//! reported as `200 {message: "..."}`; only malformed input gets a 4xx and
//! only an I/O failure gets a 5xx.

mod stream;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rooster_core::{Clock, EngineError, SystemClock};
use rooster_daemon::Manager;
use rooster_wire::{
    HomePathResponse, JobListResponse, JobLogQuery, JobLogResponse, JobUpdateRequest, MessageResponse,
    OpenCloseRequest, RemoveRequest, RunInfoResponse, TaskActionRequest,
};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PORT_WALK_ATTEMPTS: u16 = 1000;

#[derive(Clone)]
struct AppState<C: Clock> {
    manager: Arc<Manager<C>>,
}

/// Build the router: every endpoint under `/api` except `job-log-stream`
/// carries the request timeout; the stream endpoint is deliberately
/// excluded so a long-lived client doesn't get cut off.
pub fn router<C: Clock>(manager: Arc<Manager<C>>) -> Router {
    let state = AppState { manager };

    let timed = Router::new()
        .route("/home-path", get(home_path))
        .route("/run-info", get(run_info))
        .route("/job-list", get(job_list))
        .route("/run-job-resident-task", post(run_job_resident_task))
        .route("/stop-job-resident-task", post(stop_job_resident_task))
        .route("/open-close-task", post(open_close_task))
        .route("/run-task", post(run_task))
        .route("/save-task", post(save_task))
        .route("/remove-task", post(remove_task))
        .route("/job-log", get(job_log))
        .route("/job-log-download", get(job_log_download))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    let untimed = Router::new().route("/job-log-stream", get(stream::job_log_stream::<C>));

    Router::new().nest("/api", timed.merge(untimed)).with_state(state)
}

/// Bind the router to loopback, trying `base_port`, `base_port + 1`, … up
/// to [`PORT_WALK_ATTEMPTS`] offsets and keeping the first that succeeds.
pub async fn bind_with_port_walk(base_port: u16) -> std::io::Result<(TcpListener, u16)> {
    let mut last_err = None;
    for offset in 0..PORT_WALK_ATTEMPTS {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::AddrInUse, "no port available")))
}

fn engine_error_response(err: EngineError) -> Response {
    match err {
        EngineError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, Json(MessageResponse::error(err.to_string()))).into_response(),
        other => (StatusCode::OK, Json(MessageResponse::error(other.to_string()))).into_response(),
    }
}

fn ok_response() -> Response {
    (StatusCode::OK, Json(MessageResponse::ok())).into_response()
}

async fn home_path<C: Clock>(State(state): State<AppState<C>>) -> Json<HomePathResponse> {
    Json(HomePathResponse { home: state.manager.home_path() })
}

async fn run_info<C: Clock>(State(state): State<AppState<C>>) -> Json<RunInfoResponse> {
    let start = state.manager.started_at();
    let run_time_seconds = (chrono::Utc::now() - start).num_seconds().max(0);
    Json(RunInfoResponse { start, run_time_seconds })
}

async fn job_list<C: Clock>(State(state): State<AppState<C>>) -> Json<JobListResponse> {
    Json(JobListResponse { message: state.manager.list() })
}

async fn run_job_resident_task<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<JobUpdateRequest>,
) -> Response {
    match state.manager.start_resident(&req.job_id).await {
        Ok(()) => ok_response(),
        Err(err) => engine_error_response(err),
    }
}

async fn stop_job_resident_task<C: Clock>(
    State(state): State<AppState<C>>,
    Json(req): Json<JobUpdateRequest>,
) -> Response {
    match state.manager.stop(&req.job_id).await {
        Ok(()) => ok_response(),
        Err(err) => engine_error_response(err),
    }
}

async fn open_close_task<C: Clock>(State(state): State<AppState<C>>, Json(req): Json<OpenCloseRequest>) -> Response {
    match state.manager.open_close(&req.uuid, req.run).await {
        Ok(()) => ok_response(),
        Err(err) => engine_error_response(err),
    }
}

async fn run_task<C: Clock>(State(state): State<AppState<C>>, Json(req): Json<TaskActionRequest>) -> Response {
    match state.manager.run_task(&req.task_id).await {
        Ok(()) => ok_response(),
        Err(err) => engine_error_response(err),
    }
}

async fn save_task<C: Clock>(State(state): State<AppState<C>>, Json(view): Json<rooster_wire::JobView>) -> Response {
    match state.manager.save(view).await {
        Ok(_) => ok_response(),
        Err(err) => engine_error_response(err),
    }
}

async fn remove_task<C: Clock>(State(state): State<AppState<C>>, Json(req): Json<RemoveRequest>) -> Response {
    match state.manager.remove(req.identity()).await {
        Ok(()) => ok_response(),
        Err(err) => engine_error_response(err),
    }
}

async fn job_log<C: Clock>(State(state): State<AppState<C>>, Query(query): Query<JobLogQuery>) -> Response {
    let Some(path) = state.manager.job_log_path(&query.job_id) else {
        return engine_error_response(EngineError::NotFound(query.job_id));
    };
    let ring = state.manager.ring_buffer_for(&query.job_id);
    let content = rooster_logs::tail(Some(path.as_path()), ring.as_ref(), query.lines, query.bytes, 1024 * 1024);
    (StatusCode::OK, Json(JobLogResponse { content })).into_response()
}

async fn job_log_download<C: Clock>(State(state): State<AppState<C>>, Query(query): Query<JobLogQuery>) -> Response {
    let Some(path) = state.manager.job_log_path(&query.job_id) else {
        return (StatusCode::NOT_FOUND, "unknown job").into_response();
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => (StatusCode::OK, [("content-type", "text/plain; charset=utf-8")], bytes).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "log file not found").into_response(),
    }
}

/// Only used so tests can build a router over the default clock without
/// naming the generic parameter themselves.
pub fn router_default(manager: Arc<Manager<SystemClock>>) -> Router {
    router(manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rooster_storage::ConfigStore;

    fn manager_in(dir: &std::path::Path) -> Arc<Manager<SystemClock>> {
        let store = Arc::new(ConfigStore::at(dir.join("jobConfig.json"), dir.join("log")));
        Arc::new(Manager::new(SystemClock, store))
    }

    #[tokio::test]
    async fn home_path_reports_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let app = router(manager.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let resp: serde_json::Value =
            reqwest::get(format!("http://{addr}/api/home-path")).await.unwrap().json().await.unwrap();
        assert_eq!(resp["home"], dir.path().to_string_lossy().to_string());
    }

    #[tokio::test]
    async fn run_job_resident_task_reports_not_found_as_logical_message() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let app = router(manager.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://{addr}/api/run-job-resident-task"))
            .json(&serde_json::json!({"jobId": "missing"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["message"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn port_walk_finds_a_free_port() {
        let (_listener, port) = bind_with_port_walk(0).await.unwrap();
        assert!(port > 0 || port == 0);
    }
}
