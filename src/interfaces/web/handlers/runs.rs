use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::super::AppState;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 200;

#[derive(serde::Deserialize)]
pub struct RunsQuery {
    limit: Option<usize>,
}

fn journal_disabled() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": false, "error": "Run journal is disabled" }))
}

pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunsQuery>,
) -> Json<serde_json::Value> {
    let Some(journal) = state.autopilot.journal() else {
        return journal_disabled();
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    match journal.recent_runs(limit).await {
        Ok(runs) => Json(serde_json::json!({ "success": true, "runs": runs })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

pub async fn get_run(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
) -> Json<serde_json::Value> {
    let Some(journal) = state.autopilot.journal() else {
        return journal_disabled();
    };
    let run = match journal.run(&run_id).await {
        Ok(Some(run)) => run,
        Ok(None) => {
            return Json(serde_json::json!({ "success": false, "error": "Run not found" }));
        }
        Err(e) => return Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    };
    match journal.checkpoints(&run_id).await {
        Ok(checkpoints) => Json(serde_json::json!({
            "success": true,
            "run": run,
            "checkpoints": checkpoints
        })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}
