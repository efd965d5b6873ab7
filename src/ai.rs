use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::models::QuestionDraft;

/// Upload types the media path accepts, mirroring what the model ingests.
pub const SUPPORTED_MIME_TYPES: [&str; 4] =
    ["image/jpeg", "image/png", "image/webp", "application/pdf"];

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("model returned malformed content")]
    Malformed,
    #[error("model returned no questions")]
    Empty,
}

/// The AI collaborator: source content in, question drafts out. Behind a
/// trait so tests script the responses instead of calling out.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn generate_from_text(
        &self,
        text: &str,
        count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError>;

    async fn generate_from_media(
        &self,
        data_base64: &str,
        mime_type: &str,
        count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError>;
}

// ── Gemini client ────────────────────────────────────────

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(cfg: &Config) -> Self {
        let timeout = Duration::from_secs(cfg.generation_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Cannot build HTTP client");
        GeminiClient {
            http,
            api_key: cfg.gemini_api_key.clone(),
            model: cfg.gemini_model.clone(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout,
        }
    }

    async fn generate(&self, contents: Value) -> Result<Vec<QuestionDraft>, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = json!({
            "contents": contents,
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": quiz_schema(),
            }
        });

        let resp = self.http.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout)
            } else {
                GenerationError::Request(e.to_string())
            }
        })?;

        if !resp.status().is_success() {
            return Err(GenerationError::Request(format!(
                "model endpoint returned {}",
                resp.status()
            )));
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|_| GenerationError::Malformed)?;
        parse_generated(&payload)
    }
}

#[async_trait]
impl QuestionSource for GeminiClient {
    async fn generate_from_text(
        &self,
        text: &str,
        count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        let prompt = format!(
            "請根據以下內容生成一個教學測驗。請用繁體中文（香港/澳門風格，適合廣東話語境）\
             製作 {count} 條唔同種類嘅題目。\n內容：{text}"
        );
        self.generate(json!([{ "parts": [{ "text": prompt }] }]))
            .await
    }

    async fn generate_from_media(
        &self,
        data_base64: &str,
        mime_type: &str,
        count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        let kind = if mime_type.contains("pdf") { "文件" } else { "圖片" };
        let prompt = format!(
            "你係一位專業教育專家。請仔細分析上載嘅 {kind}。\
             根據入面嘅重點同事實，生成一個包含 {count} 條題目嘅測驗。\
             請確保題目有唔同難度，並使用繁體中文（香港/澳門廣東話風格語體）編寫。\
             請以 JSON 格式返回結果。"
        );
        let contents = json!([{
            "parts": [
                { "inlineData": { "mimeType": mime_type, "data": data_base64 } },
                { "text": prompt },
            ]
        }]);
        self.generate(contents).await
    }
}

/// Response schema handed to the model so it answers in parseable JSON.
fn quiz_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "text": { "type": "STRING", "description": "The question text" },
                "type": { "type": "STRING", "enum": ["mcq", "tf", "fitb"] },
                "options": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "For MCQ, provide 4 options"
                },
                "correctAnswer": { "type": "STRING" },
                "explanation": { "type": "STRING" }
            },
            "required": ["text", "type", "correctAnswer"]
        }
    })
}

/// Digs the question array out of a generateContent response. Anything that
/// does not decode cleanly is a malformed result; a clean empty array means
/// the model produced nothing usable.
fn parse_generated(payload: &Value) -> Result<Vec<QuestionDraft>, GenerationError> {
    let text = payload["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or(GenerationError::Malformed)?;
    let drafts: Vec<QuestionDraft> =
        serde_json::from_str(text).map_err(|_| GenerationError::Malformed)?;
    if drafts.is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(drafts)
}

// ── Scripted sources for tests ───────────────────────────
#[cfg(test)]
pub struct ScriptedSource {
    pub drafts: Vec<QuestionDraft>,
}

#[cfg(test)]
#[async_trait]
impl QuestionSource for ScriptedSource {
    async fn generate_from_text(
        &self,
        _text: &str,
        _count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        Ok(self.drafts.clone())
    }

    async fn generate_from_media(
        &self,
        _data_base64: &str,
        _mime_type: &str,
        _count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        Ok(self.drafts.clone())
    }
}

#[cfg(test)]
pub struct TimeoutSource;

#[cfg(test)]
#[async_trait]
impl QuestionSource for TimeoutSource {
    async fn generate_from_text(
        &self,
        _text: &str,
        _count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        Err(GenerationError::Timeout(Duration::from_secs(60)))
    }

    async fn generate_from_media(
        &self,
        _data_base64: &str,
        _mime_type: &str,
        _count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        Err(GenerationError::Timeout(Duration::from_secs(60)))
    }
}

#[cfg(test)]
pub struct EmptySource;

#[cfg(test)]
#[async_trait]
impl QuestionSource for EmptySource {
    async fn generate_from_text(
        &self,
        _text: &str,
        _count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        Err(GenerationError::Empty)
    }

    async fn generate_from_media(
        &self,
        _data_base64: &str,
        _mime_type: &str,
        _count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        Err(GenerationError::Empty)
    }
}
