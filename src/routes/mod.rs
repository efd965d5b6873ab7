use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

pub mod analytics;
pub mod classrooms;
pub mod config_route;
pub mod generate;
pub mod health;
pub mod live;
pub mod quizzes;
pub mod ws;

/// Error responses carry both the status and a JSON body with the reason.
pub type ApiError = (StatusCode, Json<Value>);

pub fn reject(status: StatusCode, msg: &str) -> ApiError {
    (status, Json(json!({ "status": "error", "error": msg })))
}
