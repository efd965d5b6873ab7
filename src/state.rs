use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::ai::QuestionSource;
use crate::config::Config;
use crate::session::SessionManager;
use crate::store::Store;

pub type WsTx = mpsc::UnboundedSender<axum::extract::ws::Message>;
/// Dashboard WebSocket connections receiving live session snapshots,
/// keyed by connection id.
pub type WsClients = DashMap<String, WsTx>;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub questions: Arc<dyn QuestionSource>,
    pub sessions: SessionManager,
    pub start_time: DateTime<Utc>,
    pub ws_clients: Arc<WsClients>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        questions: Arc<dyn QuestionSource>,
    ) -> Self {
        Self {
            config,
            store,
            questions,
            sessions: SessionManager::new(),
            start_time: Utc::now(),
            ws_clients: Arc::new(DashMap::new()),
        }
    }
}
