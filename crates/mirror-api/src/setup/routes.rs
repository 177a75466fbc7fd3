//! Route configuration and setup.

use crate::constants::{API_PREFIX, FILES_PREFIX};
use crate::handlers::{files, health, students};
use crate::state::AppState;
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/students/{id}", get(students::get_student_detail))
        .route(
            "/students/{id}/attachments/bundle",
            post(students::bundle_attachments),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .route(&format!("{}/{{*key}}", FILES_PREFIX), get(files::get_file))
        .nest(API_PREFIX, api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
