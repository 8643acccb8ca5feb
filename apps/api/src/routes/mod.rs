pub mod health;

use axum::{
    routing::{get, patch},
    Router,
};

use crate::cv::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/catalog", get(handlers::handle_get_catalog))
        .route("/api/v1/cv/:session_id", get(handlers::handle_get_cv))
        .route(
            "/api/v1/cv/:session_id/fields",
            patch(handlers::handle_patch_fields),
        )
        .route(
            "/api/v1/cv/:session_id/completeness",
            get(handlers::handle_get_completeness),
        )
        .with_state(state)
}
