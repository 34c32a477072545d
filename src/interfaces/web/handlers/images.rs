use axum::{Json, extract::State};

use super::super::AppState;

pub async fn get_services(State(state): State<AppState>) -> Json<serde_json::Value> {
    let services = state.images.probe_services().await;
    Json(serde_json::json!({ "success": true, "services": services }))
}
