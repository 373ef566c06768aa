use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::error::GradeError;
use crate::model::grade::{ErrorResponse, GradeRequest, GradeResponse};
use crate::protocol::{AppState, SERVICE_NAME};
use crate::services::grading;

fn ok(grade: String) -> Response {
    (StatusCode::OK, Json(GradeResponse { grade })).into_response()
}

fn err(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}

fn failure(e: &GradeError) -> Response {
    if e.is_client_error() {
        warn!(error = %e, "rejected grade request");
        return err(StatusCode::BAD_REQUEST, ErrorResponse::new(e.to_string()));
    }
    error!(error = %e, "grading failed");
    err(StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::generic())
}

/// `POST /api/grade`
///
/// The body is taken raw so that malformed JSON, or a body that cannot be
/// read at all, still gets an `ErrorResponse`.
pub async fn grade(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(b) => b,
        Err(rejection) => {
            warn!(error = %rejection, "failed to read grade request body");
            return err(rejection.status(), ErrorResponse::new(rejection.body_text()));
        }
    };

    let request = match GradeRequest::from_json(&body) {
        Ok(r) => r,
        Err(e) => return failure(&e),
    };

    match grading::grade_essay(state.model.as_ref(), &request).await {
        Ok(grade) => ok(grade),
        Err(e) => failure(&e),
    }
}

/// `GET /api/health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}
