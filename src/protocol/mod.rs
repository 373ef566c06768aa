//! HTTP surface of the grading service.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::services::ai::CompletionModel;

mod grade;

pub use grade::{grade, health};

pub const SERVICE_NAME: &str = "essay-grader";

/// Shared handler state. Holds nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn CompletionModel>,
}

impl AppState {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/grade", post(grade))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}
