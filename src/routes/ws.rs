use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::models::random_id;
use crate::state::AppState;

/// GET /ws — live session feed for the teacher dashboard. One-way: the
/// server pushes a snapshot on every timer and roster tick.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();

    // Forward channel → WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    let client_id = random_id(8);
    state.ws_clients.insert(client_id.clone(), tx.clone());
    tracing::info!("Dashboard WS client connected: {client_id}");

    // Late joiners get the current live state straight away instead of
    // waiting for the next tick.
    if let Some(snapshot) = state
        .sessions
        .current_snapshot(state.config.leaderboard_size)
        .await
    {
        let msg = serde_json::json!({ "type": "session", "session": snapshot }).to_string();
        let _ = tx.send(Message::Text(msg.into()));
    }

    while let Some(Ok(msg)) = ws_rx.next().await {
        if let Message::Close(_) = msg {
            break;
        }
    }

    state.ws_clients.remove(&client_id);
    tracing::info!("Dashboard WS client disconnected: {client_id}");
    send_task.abort();
}
