use axum::{routing::get, Router};
use pinpost_core::PinpostConfig;
use pinpost_scheduler::SweepTrigger;
use pinpost_store::PinStore;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Central shared state: passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: PinpostConfig,
    pub store: Arc<dyn PinStore>,
    /// Hands sweeps to the background worker; never runs one inline.
    pub trigger: SweepTrigger,
}

impl AppState {
    pub fn new(config: PinpostConfig, store: Arc<dyn PinStore>, trigger: SweepTrigger) -> Self {
        Self {
            config,
            store,
            trigger,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::http::index::index_handler))
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/api/pins",
            axum::routing::post(crate::http::pins::create_pin_handler),
        )
        .route("/api/pins/{id}", get(crate::http::pins::get_pin_handler))
        .route(
            "/api/run-scheduler",
            get(crate::http::trigger::trigger_handler).post(crate::http::trigger::trigger_handler),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
