use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;
use crate::store;

/// GET /api/analytics — library totals and the most recent quizzes, the
/// numbers the dashboard cards are built from.
pub async fn analytics(State(state): State<Arc<AppState>>) -> Result<Json<Value>, StatusCode> {
    let quizzes = store::list_quizzes(state.store.as_ref())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let classrooms = store::list_classrooms(state.store.as_ref())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let total_questions: usize = quizzes.iter().map(|q| q.questions.len()).sum();
    let recent: Vec<Value> = quizzes
        .iter()
        .take(3)
        .map(|q| {
            json!({
                "id": q.id,
                "title": q.title,
                "questionCount": q.questions.len(),
                "createdAt": q.created_at,
            })
        })
        .collect();

    Ok(Json(json!({
        "totalQuizzes": quizzes.len(),
        "totalClassrooms": classrooms.len(),
        "totalQuestions": total_questions,
        "recentQuizzes": recent,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::EmptySource;
    use crate::config::Config;
    use crate::models::{Question, QuestionDraft, QuestionType};
    use crate::routes::quizzes::{self, NewQuiz};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn totals_follow_the_library() {
        let state = Arc::new(AppState::new(
            Config::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(EmptySource),
        ));

        for i in 0..4 {
            let question = Question::from_draft(QuestionDraft {
                text: format!("問題 {i}"),
                question_type: QuestionType::Tf,
                options: None,
                correct_answer: "true".to_string(),
                explanation: None,
            });
            quizzes::create_quiz(
                axum::extract::State(state.clone()),
                Json(NewQuiz {
                    title: format!("測驗 {i}"),
                    category: None,
                    questions: vec![question],
                }),
            )
            .await
            .unwrap();
        }

        let resp = analytics(State(state)).await.unwrap();
        assert_eq!(resp.0["totalQuizzes"], 4);
        assert_eq!(resp.0["totalQuestions"], 4);
        assert_eq!(resp.0["recentQuizzes"].as_array().unwrap().len(), 3);
        // Newest first.
        assert_eq!(resp.0["recentQuizzes"][0]["title"], "測驗 3");
    }
}
