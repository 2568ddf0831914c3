pub mod health;
pub mod index;
pub mod pins;
pub mod trigger;

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// JSON error body shared by every route: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub type ApiRejection = (StatusCode, Json<ApiError>);

pub fn reject(status: StatusCode, error: impl Into<String>) -> ApiRejection {
    (
        status,
        Json(ApiError {
            error: error.into(),
        }),
    )
}
