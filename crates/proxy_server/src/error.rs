use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Body of every failed request. Always 500: clients only need to know it failed.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: &'static str,
    pub details: String,
}

impl ApiError {
    pub fn new(error: &'static str, cause: impl std::fmt::Display) -> Self {
        Self { error, details: cause.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}
