use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

mod ai;
mod config;
mod leaderboard;
mod models;
mod routes;
mod session;
mod state;
mod store;

use state::AppState;

fn app(shared: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/config", get(routes::config_route::get_config))
        .route("/analytics", get(routes::analytics::analytics))
        // Quiz library
        .route(
            "/quizzes",
            get(routes::quizzes::list_quizzes).post(routes::quizzes::create_quiz),
        )
        .route(
            "/quizzes/:id",
            get(routes::quizzes::get_quiz).delete(routes::quizzes::delete_quiz),
        )
        // AI generation
        .route("/generate/text", post(routes::generate::from_text))
        .route("/generate/media", post(routes::generate::from_media))
        // Classrooms
        .route(
            "/classrooms",
            get(routes::classrooms::list_classrooms).post(routes::classrooms::create_classroom),
        )
        .route("/classrooms/:id", delete(routes::classrooms::delete_classroom))
        .route("/classrooms/:id/assign", post(routes::classrooms::assign_quiz))
        // Live session
        .route("/quizzes/:id/session", get(routes::live::session_state))
        .route("/quizzes/:id/session/start", post(routes::live::start_session))
        .route("/quizzes/:id/session/end", post(routes::live::end_session));

    Router::new()
        .nest("/api", api)
        .route("/ws", get(routes::ws::ws_handler))
        .fallback_service(ServeDir::new("frontend"))
        .layer(CorsLayer::permissive())
        .with_state(shared)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .init();

    let cfg = config::load_config();
    tracing::info!("Config loaded — port {}, redis {}", cfg.port, cfg.redis_url);
    if cfg.gemini_api_key.is_empty() {
        tracing::warn!("No Gemini API key configured — quiz generation will fail");
    }

    // Redis connection
    let redis_client = redis::Client::open(cfg.redis_url.as_str())
        .expect("Invalid redis_url in config");
    let redis_conn = redis_client
        .get_connection_manager()
        .await
        .expect("Cannot connect to Redis — is it running?");

    let quiz_store = Arc::new(store::RedisStore::new(redis_conn, &cfg.key_prefix));
    let generator = Arc::new(ai::GeminiClient::new(&cfg));
    let shared = Arc::new(AppState::new(cfg.clone(), quiz_store, generator));

    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Cannot bind address");

    tracing::info!("🚀 QuizMind backend listening on http://{addr}");
    axum::serve(listener, app(shared)).await.unwrap();
}
