use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

/// Sanitized config readout; the API key never leaves the process.
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Value> {
    let cfg = &state.config;
    Json(json!({
        "port": cfg.port,
        "key_prefix": cfg.key_prefix,
        "gemini_model": cfg.gemini_model,
        "generation_timeout_secs": cfg.generation_timeout_secs,
        "session_duration_secs": cfg.session_duration_secs,
        "timer_tick_secs": cfg.timer_tick_secs,
        "roster_tick_secs": cfg.roster_tick_secs,
        "leaderboard_size": cfg.leaderboard_size,
        "demo_participants": cfg.demo_participants,
    }))
}
