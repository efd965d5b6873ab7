use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Classroom, Quiz};

pub const QUIZZES_KEY: &str = "quizzes";
pub const CLASSROOMS_KEY: &str = "classrooms";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Flat key-value persistence. Each collection lives as one JSON document
/// under a single key, so every mutation is a whole-collection
/// read-modify-write. Fine for a single logical writer.
#[async_trait]
pub trait Store: Send + Sync {
    async fn read(&self, key: &str) -> StoreResult<Option<String>>;
    async fn write(&self, key: &str, value: &str) -> StoreResult<()>;
}

// ── Redis backend ────────────────────────────────────────
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, prefix: &str) -> Self {
        RedisStore {
            conn,
            prefix: prefix.to_string(),
        }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let full = format!("{}:{key}", self.prefix);
        conn.get(&full)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let full = format!("{}:{key}", self.prefix);
        conn.set(&full, value)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

// ── Typed collection access ──────────────────────────────

/// Absent or unreadable stored values decode as the empty collection; a
/// corrupted blob must never take the whole screen down.
fn decode_collection<T: DeserializeOwned>(key: &str, raw: Option<String>) -> Vec<T> {
    match raw {
        None => Vec::new(),
        Some(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!("Stored `{key}` is unreadable ({e}), treating as empty");
            Vec::new()
        }),
    }
}

async fn read_collection<T: DeserializeOwned>(store: &dyn Store, key: &str) -> StoreResult<Vec<T>> {
    let raw = store.read(key).await?;
    Ok(decode_collection(key, raw))
}

async fn write_collection<T: Serialize>(
    store: &dyn Store,
    key: &str,
    items: &[T],
) -> StoreResult<()> {
    let json = serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string());
    store.write(key, &json).await
}

// ── Quizzes ──────────────────────────────────────────────
pub async fn list_quizzes(store: &dyn Store) -> StoreResult<Vec<Quiz>> {
    read_collection(store, QUIZZES_KEY).await
}

/// Prepends, so `list_quizzes` returns newest first.
pub async fn save_quiz(store: &dyn Store, quiz: Quiz) -> StoreResult<()> {
    let mut quizzes = list_quizzes(store).await?;
    quizzes.insert(0, quiz);
    write_collection(store, QUIZZES_KEY, &quizzes).await
}

pub async fn find_quiz(store: &dyn Store, id: &str) -> StoreResult<Option<Quiz>> {
    let quizzes = list_quizzes(store).await?;
    Ok(quizzes.into_iter().find(|q| q.id == id))
}

pub async fn delete_quiz(store: &dyn Store, id: &str) -> StoreResult<bool> {
    let mut quizzes = list_quizzes(store).await?;
    let before = quizzes.len();
    quizzes.retain(|q| q.id != id);
    if quizzes.len() == before {
        return Ok(false);
    }
    write_collection(store, QUIZZES_KEY, &quizzes).await?;
    Ok(true)
}

// ── Classrooms ───────────────────────────────────────────
pub async fn list_classrooms(store: &dyn Store) -> StoreResult<Vec<Classroom>> {
    read_collection(store, CLASSROOMS_KEY).await
}

pub async fn save_classroom(store: &dyn Store, classroom: Classroom) -> StoreResult<()> {
    let mut classrooms = list_classrooms(store).await?;
    classrooms.insert(0, classroom);
    write_collection(store, CLASSROOMS_KEY, &classrooms).await
}

pub async fn delete_classroom(store: &dyn Store, id: &str) -> StoreResult<bool> {
    let mut classrooms = list_classrooms(store).await?;
    let before = classrooms.len();
    classrooms.retain(|c| c.id != id);
    if classrooms.len() == before {
        return Ok(false);
    }
    write_collection(store, CLASSROOMS_KEY, &classrooms).await?;
    Ok(true)
}

/// Set-union semantics: assigning an already-assigned quiz is a no-op.
/// Returns the updated classroom, or `None` when the classroom is unknown.
pub async fn assign_quiz(
    store: &dyn Store,
    classroom_id: &str,
    quiz_id: &str,
) -> StoreResult<Option<Classroom>> {
    let mut classrooms = list_classrooms(store).await?;
    let Some(classroom) = classrooms.iter_mut().find(|c| c.id == classroom_id) else {
        return Ok(None);
    };
    if !classroom.assigned_quiz_ids.iter().any(|id| id == quiz_id) {
        classroom.assigned_quiz_ids.push(quiz_id.to_string());
    }
    let updated = classroom.clone();
    write_collection(store, CLASSROOMS_KEY, &classrooms).await?;
    Ok(Some(updated))
}

// ── In-memory backend for tests ──────────────────────────
#[cfg(test)]
pub struct MemoryStore {
    data: dashmap::DashMap<String, String>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            data: dashmap::DashMap::new(),
        }
    }

    pub fn preload(self, key: &str, value: &str) -> Self {
        self.data.insert(key.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
#[async_trait]
impl Store for MemoryStore {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.data.get(key).map(|v| v.value().clone()))
    }

    async fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
