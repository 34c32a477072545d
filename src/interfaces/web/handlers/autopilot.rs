use axum::{Json, body::Bytes, extract::State};
use std::sync::Arc;
use tracing::info;

use super::super::AppState;
use crate::core::autopilot::ConfigPatch;

/// An absent or empty body is an empty patch.
fn parse_patch(body: &Bytes) -> Result<ConfigPatch, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ConfigPatch::default());
    }
    serde_json::from_slice(body).map_err(|e| format!("Invalid autopilot config: {}", e))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.autopilot.stats().await;
    Json(serde_json::json!({
        "success": true,
        "stats": stats,
        "job_in_flight": state.autopilot.is_job_in_flight(),
    }))
}

pub async fn get_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.autopilot.config().await;
    Json(serde_json::json!({ "success": true, "config": config }))
}

pub async fn update_config(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<serde_json::Value> {
    let patch = match parse_patch(&body) {
        Ok(patch) => patch,
        Err(e) => return Json(serde_json::json!({ "success": false, "error": e })),
    };
    match state.autopilot.update_config(patch).await {
        Ok(()) => {
            let config = state.autopilot.config().await;
            Json(serde_json::json!({ "success": true, "config": config }))
        }
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

pub async fn start(State(state): State<AppState>, body: Bytes) -> Json<serde_json::Value> {
    let patch = match parse_patch(&body) {
        Ok(patch) => patch,
        Err(e) => return Json(serde_json::json!({ "success": false, "error": e })),
    };
    match state.autopilot.start(patch).await {
        Ok(()) => {
            let config = state.autopilot.config().await;
            Json(serde_json::json!({ "success": true, "config": config }))
        }
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

pub async fn stop(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.autopilot.stop().await;
    Json(serde_json::json!({ "success": true }))
}

pub async fn run_now(State(state): State<AppState>) -> Json<serde_json::Value> {
    if state.autopilot.is_job_in_flight() {
        return Json(serde_json::json!({
            "success": false,
            "error": "Blog creation already in progress"
        }));
    }
    let autopilot = Arc::clone(&state.autopilot);
    tokio::spawn(async move {
        let outcome = autopilot.run_cycle().await;
        info!("Manual run finished: {:?}", outcome);
    });
    Json(serde_json::json!({ "success": true, "message": "Blog creation started" }))
}
