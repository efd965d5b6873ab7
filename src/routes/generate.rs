use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::ai::{GenerationError, SUPPORTED_MIME_TYPES};
use crate::models::Question;
use crate::routes::{reject, ApiError};
use crate::state::AppState;

fn default_count() -> u32 {
    5
}

#[derive(Deserialize)]
pub struct GenerateTextRequest {
    pub text: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMediaRequest {
    /// Base64-encoded document or image.
    pub data: String,
    pub mime_type: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

/// POST /api/generate/text
/// Body: { "text": "...", "count": 5 }
pub async fn from_text(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateTextRequest>,
) -> Result<Json<Value>, ApiError> {
    if body.text.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "source text is empty"));
    }
    if !(1..=20).contains(&body.count) {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "question count must be between 1 and 20",
        ));
    }

    match state.questions.generate_from_text(&body.text, body.count).await {
        Ok(drafts) => Ok(Json(finish(drafts))),
        Err(e) => {
            tracing::warn!("Text generation failed: {e}");
            Err(generation_failure(&e))
        }
    }
}

/// POST /api/generate/media
/// Body: { "data": "<base64>", "mimeType": "application/pdf", "count": 5 }
pub async fn from_media(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateMediaRequest>,
) -> Result<Json<Value>, ApiError> {
    if !SUPPORTED_MIME_TYPES.contains(&body.mime_type.as_str()) {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "unsupported upload type, use PDF or JPG/PNG/WEBP",
        ));
    }
    if base64::engine::general_purpose::STANDARD
        .decode(&body.data)
        .is_err()
    {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "upload payload is not valid base64",
        ));
    }
    if !(1..=20).contains(&body.count) {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "question count must be between 1 and 20",
        ));
    }

    match state
        .questions
        .generate_from_media(&body.data, &body.mime_type, body.count)
        .await
    {
        Ok(drafts) => Ok(Json(finish(drafts))),
        Err(e) => {
            tracing::warn!("Media generation failed: {e}");
            Err(generation_failure(&e))
        }
    }
}

/// Drafts get their ids here, on receipt from the collaborator.
fn finish(drafts: Vec<crate::models::QuestionDraft>) -> Value {
    let questions: Vec<Question> = drafts.into_iter().map(Question::from_draft).collect();
    tracing::info!("✨ Generated {} questions", questions.len());
    json!({
        "status": "ok",
        "count": questions.len(),
        "questions": questions
    })
}

/// All generation failures come back as 502 and look the same to the
/// caller, except a timeout which gets its own status and tag.
fn generation_failure(e: &GenerationError) -> ApiError {
    let (status, kind) = match e {
        GenerationError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        _ => (StatusCode::BAD_GATEWAY, "generation"),
    };
    (
        status,
        Json(json!({
            "status": "error",
            "kind": kind,
            "error": e.to_string()
        })),
    )
}
