//! Pin intake: POST /api/pins, and read-back: GET /api/pins/{id}.
//!
//! Request:  `{"credential", "targetBoard", "mediaUrl", "scheduledAt",
//!            "description"?, "link"?}`
//! Response: `201 {"message": "Pin scheduled successfully!", "id": 1}`
//! Error:    `400|404|500 {"error": "..."}`

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use pinpost_store::{NewPinRequest, ScheduledPin};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

use crate::app::AppState;
use crate::http::{reject, ApiRejection};

#[derive(Debug, Serialize)]
pub struct PinCreated {
    pub message: &'static str,
    pub id: i64,
}

/// POST /api/pins: validate and persist a new scheduled pin.
pub async fn create_pin_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewPinRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PinCreated>), ApiRejection> {
    let Json(req) = payload.map_err(|e| {
        warn!(error = %e, "rejected malformed pin request");
        reject(StatusCode::BAD_REQUEST, e.body_text())
    })?;

    let new_pin = req.validate().map_err(|e| {
        warn!(error = %e, "rejected invalid pin request");
        reject(StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let id = state.store.insert(&new_pin).await.map_err(|e| {
        error!(error = %e, "failed to persist pin");
        reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to schedule pin")
    })?;

    Ok((
        StatusCode::CREATED,
        Json(PinCreated {
            message: "Pin scheduled successfully!",
            id,
        }),
    ))
}

/// GET /api/pins/{id}: the stored pin, without its credential.
pub async fn get_pin_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ScheduledPin>, ApiRejection> {
    match state.store.get(id).await {
        Ok(Some(pin)) => Ok(Json(pin)),
        Ok(None) => Err(reject(StatusCode::NOT_FOUND, format!("Pin not found: {id}"))),
        Err(e) => {
            error!(pin_id = id, error = %e, "failed to read pin");
            Err(reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read pin"))
        }
    }
}
