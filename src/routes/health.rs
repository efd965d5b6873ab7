use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;
use crate::store;

/// GET /api/health — "degraded" means the process is up but the store
/// is not answering, so saved quizzes and classrooms are unavailable.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let uptime = Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds();

    let store_ok = state.store.read(store::QUIZZES_KEY).await.is_ok();

    Json(json!({
        "status": if store_ok { "ok" } else { "degraded" },
        "store": if store_ok { "reachable" } else { "unreachable" },
        "keyPrefix": state.config.key_prefix,
        "uptimeSecs": uptime,
        "timestamp": Utc::now().to_rfc3339()
    }))
}
