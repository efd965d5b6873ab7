use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::session::{self, SessionState};
use crate::state::AppState;
use crate::store;

/// POST /api/quizzes/:id/session/start
/// An unknown quiz id never reaches the state machine; it is a plain 404.
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let quiz = store::find_quiz(state.store.as_ref(), &id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let snapshot = state
        .sessions
        .start(quiz.id.clone(), &state.config, state.ws_clients.clone())
        .await;

    tracing::info!("🎬 Live session started for '{}'", quiz.title);
    Ok(Json(json!({ "status": "ok", "session": snapshot })))
}

/// GET /api/quizzes/:id/session — live snapshot, or an idle one when no
/// session is running for this quiz.
pub async fn session_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let quiz = store::find_quiz(state.store.as_ref(), &id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let snapshot = match state
        .sessions
        .snapshot_for(&quiz.id, state.config.leaderboard_size)
        .await
    {
        Some(s) => s,
        None => SessionState::new(quiz.id, state.config.session_duration_secs)
            .snapshot(state.config.leaderboard_size),
    };

    Ok(Json(json!({ "session": snapshot })))
}

/// POST /api/quizzes/:id/session/end — stops both tick streams and hands
/// the final roster snapshot to the dashboard.
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let snapshot = state
        .sessions
        .end(&id, state.config.leaderboard_size)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    session::broadcast_snapshot(&state.ws_clients, &snapshot);
    tracing::info!("🏁 Live session ended for quiz {id}");
    Ok(Json(json!({ "status": "ok", "session": snapshot })))
}
