use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::models::Classroom;
use crate::routes::{reject, ApiError};
use crate::state::AppState;
use crate::store;

#[derive(Deserialize)]
pub struct NewClassroom {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub quiz_id: String,
}

/// GET /api/classrooms
pub async fn list_classrooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, StatusCode> {
    let classrooms = store::list_classrooms(state.store.as_ref())
        .await
        .map_err(|e| {
            tracing::warn!("Classroom list read failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(json!({
        "count": classrooms.len(),
        "classrooms": classrooms
    })))
}

/// POST /api/classrooms — creates a classroom with a fresh join code
pub async fn create_classroom(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewClassroom>,
) -> Result<Json<Value>, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "classroom name is empty"));
    }

    let classroom = Classroom::new(name.to_string());
    store::save_classroom(state.store.as_ref(), classroom.clone())
        .await
        .map_err(|e| {
            tracing::warn!("Classroom save failed: {e}");
            reject(StatusCode::INTERNAL_SERVER_ERROR, "classroom save failed")
        })?;

    tracing::info!("🏫 Created classroom '{}' (code {})", classroom.name, classroom.code);
    Ok(Json(json!({ "status": "ok", "classroom": classroom })))
}

/// DELETE /api/classrooms/:id
pub async fn delete_classroom(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let removed = store::delete_classroom(state.store.as_ref(), &id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !removed {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({ "status": "ok" })))
}

/// POST /api/classrooms/:id/assign
/// Body: { "quizId": "q_..." } — idempotent, and only for quizzes that exist.
pub async fn assign_quiz(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<Value>, StatusCode> {
    let quiz = store::find_quiz(state.store.as_ref(), &body.quiz_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if quiz.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let classroom = store::assign_quiz(state.store.as_ref(), &id, &body.quiz_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(json!({ "status": "ok", "classroom": classroom })))
}
