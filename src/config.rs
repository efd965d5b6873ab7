use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub key_prefix: String,
    /// Gemini API key; `GEMINI_API_KEY` in the environment overrides this.
    #[serde(default)]
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub generation_timeout_secs: u64,
    pub session_duration_secs: u32,
    pub timer_tick_secs: u64,
    pub roster_tick_secs: u64,
    pub leaderboard_size: usize,
    /// Names seeded into the roster when a live session starts.
    pub demo_participants: Vec<String>,
    /// Fixed seed for the roster simulation; unset means a fresh seed per run.
    #[serde(default)]
    pub simulation_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "quizmind".to_string(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-3-flash-preview".to_string(),
            generation_timeout_secs: 60,
            session_duration_secs: 1200,
            timer_tick_secs: 1,
            roster_tick_secs: 2,
            leaderboard_size: 5,
            demo_participants: [
                "阿明", "嘉嘉", "小明", "志偉", "美儀", "阿強", "婉珊", "子軒",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            simulation_seed: None,
        }
    }
}

pub fn load_config() -> Config {
    let mut cfg = match fs::read_to_string("config.toml") {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse config.toml: {e}, using defaults");
            Config::default()
        }),
        Err(_) => {
            tracing::info!("No config.toml found, using defaults");
            Config::default()
        }
    };

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            cfg.gemini_api_key = key;
        }
    }

    cfg
}
