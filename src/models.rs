use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

// ── Questions ────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Tf,
    Fitb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// A generated question as returned by the AI collaborator — same shape as
/// [`Question`] but without a stable id. The backend assigns one on receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    pub fn from_draft(draft: QuestionDraft) -> Self {
        Question {
            id: random_id(9),
            text: draft.text,
            question_type: draft.question_type,
            options: draft.options,
            correct_answer: draft.correct_answer,
            explanation: draft.explanation,
        }
    }

    /// MCQ questions need exactly 4 options with the correct answer among
    /// them; other types carry the answer inline.
    pub fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("question text is empty".to_string());
        }
        if self.correct_answer.trim().is_empty() {
            return Err("question has no correct answer".to_string());
        }
        if self.question_type == QuestionType::Mcq {
            let options = self
                .options
                .as_ref()
                .ok_or_else(|| "mcq question has no options".to_string())?;
            if options.len() != 4 {
                return Err(format!("mcq question has {} options, expected 4", options.len()));
            }
            if !options.contains(&self.correct_answer) {
                return Err("mcq correct answer is not one of the options".to_string());
            }
        }
        Ok(())
    }
}

// ── Quiz ─────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub category: String,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    /// Human-readable "last modified" label shown in the quiz list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

// ── Classroom ────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub id: String,
    pub name: String,
    /// Short join code handed out to students; not authenticated.
    pub code: String,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub assigned_quiz_ids: Vec<String>,
}

impl Classroom {
    pub fn new(name: String) -> Self {
        Classroom {
            id: format!("c_{}", Utc::now().timestamp_millis()),
            name,
            code: join_code(),
            students: Vec::new(),
            assigned_quiz_ids: Vec::new(),
        }
    }
}

// ── Id helpers ───────────────────────────────────────────
pub fn random_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect()
}

/// 5-character uppercase join code, displayed on the classroom card.
pub fn join_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect()
}
