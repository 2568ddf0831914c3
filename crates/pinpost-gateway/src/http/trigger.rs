//! Sweep trigger: GET|POST /api/run-scheduler.
//!
//! Meant for an external cron caller. The sweep is handed to the background
//! worker and the response goes out straight away; the caller never learns
//! how the sweep went. Outcomes are visible in the server logs and in
//! `last_sweep` on `/health`.

use axum::{extract::State, http::StatusCode, Json};
use pinpost_scheduler::TriggerStatus;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::app::AppState;
use crate::http::{reject, ApiRejection};

#[derive(Debug, Serialize)]
pub struct TriggerAccepted {
    pub message: &'static str,
    pub status: TriggerStatus,
    /// Logged by the worker beside the `sweep_id` of the sweep it queued.
    /// A coalesced receipt appears only in this handler's log line.
    pub receipt_id: Uuid,
}

pub async fn trigger_handler(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<TriggerAccepted>), ApiRejection> {
    let receipt_id = Uuid::new_v4();
    match state.trigger.request(receipt_id) {
        Ok(status) => {
            info!(%receipt_id, ?status, "sweep requested");
            Ok((
                StatusCode::ACCEPTED,
                Json(TriggerAccepted {
                    message: "Scheduler triggered",
                    status,
                    receipt_id,
                }),
            ))
        }
        Err(e) => {
            error!(%receipt_id, error = %e, "sweep request refused");
            Err(reject(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
    }
}
