use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, returns server metadata and the last sweep.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git_sha": env!("PINPOST_GIT_SHA"),
        "scheduler": {
            "poll_interval_secs": state.config.scheduler.poll_interval_secs,
            "queue_depth": state.config.scheduler.queue_depth,
        },
        "last_sweep": state.trigger.last_sweep(),
    }))
}
