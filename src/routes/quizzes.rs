use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::models::{Question, Quiz};
use crate::routes::{reject, ApiError};
use crate::state::AppState;
use crate::store;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuiz {
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// GET /api/quizzes — the quiz library, newest first
pub async fn list_quizzes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, StatusCode> {
    let quizzes = store::list_quizzes(state.store.as_ref())
        .await
        .map_err(|e| {
            tracing::warn!("Quiz list read failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(json!({
        "count": quizzes.len(),
        "quizzes": quizzes
    })))
}

/// GET /api/quizzes/:id
pub async fn get_quiz(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Quiz>, StatusCode> {
    let quiz = store::find_quiz(state.store.as_ref(), &id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(quiz))
}

/// POST /api/quizzes — save a generated quiz. All validation happens before
/// any write, so a rejected save leaves the library untouched.
pub async fn create_quiz(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewQuiz>,
) -> Result<Json<Value>, ApiError> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "quiz title is empty"));
    }
    if body.questions.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "quiz has no questions"));
    }
    for q in &body.questions {
        if let Err(e) = q.validate() {
            return Err(reject(StatusCode::BAD_REQUEST, &e));
        }
    }

    let quiz = Quiz {
        id: format!("q_{}", Utc::now().timestamp_millis()),
        title: title.to_string(),
        category: body.category.unwrap_or_else(|| "一般".to_string()),
        questions: body.questions,
        created_at: Utc::now(),
        modified: Some("啱啱".to_string()),
    };

    store::save_quiz(state.store.as_ref(), quiz.clone())
        .await
        .map_err(|e| {
            tracing::warn!("Quiz save failed: {e}");
            reject(StatusCode::INTERNAL_SERVER_ERROR, "quiz save failed")
        })?;

    tracing::info!("💾 Saved quiz '{}' ({} questions)", quiz.title, quiz.questions.len());
    Ok(Json(json!({ "status": "ok", "quiz": quiz })))
}

/// DELETE /api/quizzes/:id
pub async fn delete_quiz(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let removed = store::delete_quiz(state.store.as_ref(), &id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !removed {
        return Err(StatusCode::NOT_FOUND);
    }
    tracing::info!("🗑️ Deleted quiz {id}");
    Ok(Json(json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ScriptedSource;
    use crate::config::Config;
    use crate::models::{QuestionDraft, QuestionType};
    use crate::routes::{generate, live};
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn mcq_draft(n: usize) -> QuestionDraft {
        QuestionDraft {
            text: format!("光合作用問題 {n}"),
            question_type: QuestionType::Mcq,
            options: Some(vec![
                "葉綠素".to_string(),
                "線粒體".to_string(),
                "細胞核".to_string(),
                "細胞壁".to_string(),
            ]),
            correct_answer: "葉綠素".to_string(),
            explanation: Some("因為咁".to_string()),
        }
    }

    fn test_state(drafts: Vec<QuestionDraft>) -> Arc<AppState> {
        let cfg = Config {
            simulation_seed: Some(5),
            ..Config::default()
        };
        Arc::new(AppState::new(
            cfg,
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedSource { drafts }),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn generate_save_and_run_live_end_to_end() {
        let state = test_state((0..5).map(mcq_draft).collect());

        // Generate 5 drafts from pasted notes.
        let resp = generate::from_text(
            State(state.clone()),
            Json(generate::GenerateTextRequest {
                text: "photosynthesis notes".to_string(),
                count: 5,
            }),
        )
        .await
        .unwrap();
        let questions: Vec<Question> =
            serde_json::from_value(resp.0["questions"].clone()).unwrap();
        assert_eq!(questions.len(), 5);

        // Save with a title.
        let resp = create_quiz(
            State(state.clone()),
            Json(NewQuiz {
                title: "Bio Quiz 1".to_string(),
                category: None,
                questions,
            }),
        )
        .await
        .unwrap();
        assert_eq!(resp.0["status"], "ok");
        let quiz_id = resp.0["quiz"]["id"].as_str().unwrap().to_string();

        // Exactly one library entry with that title and 5 questions.
        let resp = list_quizzes(State(state.clone())).await.unwrap();
        assert_eq!(resp.0["count"], 1);
        assert_eq!(resp.0["quizzes"][0]["title"], "Bio Quiz 1");
        assert_eq!(resp.0["quizzes"][0]["questions"].as_array().unwrap().len(), 5);

        // Start the live session: roster seeded with the demo participants.
        let resp = live::start_session(State(state.clone()), Path(quiz_id.clone()))
            .await
            .unwrap();
        let roster = resp.0["session"]["roster"].as_array().unwrap();
        assert_eq!(roster.len(), state.config.demo_participants.len());

        // After simulated time the leaderboard leader has the top score.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(4)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        let resp = live::session_state(State(state.clone()), Path(quiz_id.clone()))
            .await
            .unwrap();
        let snapshot = &resp.0["session"];
        let top = snapshot["leaderboard"][0]["score"].as_u64().unwrap();
        let max = snapshot["roster"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["score"].as_u64().unwrap())
            .max()
            .unwrap();
        assert_eq!(top, max);

        live::end_session(State(state), Path(quiz_id)).await.unwrap();
    }

    #[tokio::test]
    async fn empty_title_save_is_bad_request_without_side_effects() {
        let state = test_state(vec![]);
        let (status, body) = create_quiz(
            State(state.clone()),
            Json(NewQuiz {
                title: "   ".to_string(),
                category: None,
                questions: vec![Question::from_draft(mcq_draft(0))],
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0["status"], "error");

        let resp = list_quizzes(State(state)).await.unwrap();
        assert_eq!(resp.0["count"], 0);
    }

    #[tokio::test]
    async fn quiz_without_questions_is_bad_request() {
        let state = test_state(vec![]);
        let (status, _) = create_quiz(
            State(state.clone()),
            Json(NewQuiz {
                title: "空白測驗".to_string(),
                category: None,
                questions: vec![],
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(list_quizzes(State(state)).await.unwrap().0["count"], 0);
    }

    #[tokio::test]
    async fn invalid_mcq_question_is_bad_request() {
        let state = test_state(vec![]);
        let mut bad = Question::from_draft(mcq_draft(0));
        bad.correct_answer = "唔喺選項入面".to_string();
        let (status, _) = create_quiz(
            State(state.clone()),
            Json(NewQuiz {
                title: "爛測驗".to_string(),
                category: None,
                questions: vec![bad],
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(list_quizzes(State(state)).await.unwrap().0["count"], 0);
    }

    #[tokio::test]
    async fn deleted_quiz_is_not_found() {
        let state = test_state(vec![]);
        let resp = create_quiz(
            State(state.clone()),
            Json(NewQuiz {
                title: "短命測驗".to_string(),
                category: None,
                questions: vec![Question::from_draft(mcq_draft(0))],
            }),
        )
        .await
        .unwrap();
        let quiz_id = resp.0["quiz"]["id"].as_str().unwrap().to_string();

        delete_quiz(State(state.clone()), Path(quiz_id.clone()))
            .await
            .unwrap();

        assert_eq!(
            get_quiz(State(state.clone()), Path(quiz_id.clone()))
                .await
                .err(),
            Some(StatusCode::NOT_FOUND)
        );
        // The live screen for a deleted quiz renders not-found, never panics.
        assert_eq!(
            live::start_session(State(state), Path(quiz_id)).await.err(),
            Some(StatusCode::NOT_FOUND)
        );
    }
}
