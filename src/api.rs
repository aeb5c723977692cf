use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::chat::ChatService;
use crate::notify::DispatchMessage;
use crate::relay::{CycleReport, Relay};

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    /// `None` when the chat path is disabled.
    pub chat: Option<Arc<ChatService>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", any(root))
        .route("/health", get(|| async { "OK" }))
        .route("/run-reddit-check", get(run_check))
        .route("/fetch-posts", get(fetch_posts))
        .route("/gpt/{text}", get(gpt))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> String {
    match &state.chat {
        Some(chat) => chat.greeting(),
        None => "Hello! The relay bot is running.".to_string(),
    }
}

async fn run_check(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.relay.run_cycle().await {
        CycleReport::Dispatched { .. } | CycleReport::NothingNew { .. } => {
            (StatusCode::OK, "Reddit check executed successfully.")
        }
        CycleReport::Busy => (StatusCode::CONFLICT, "Reddit check already in progress."),
        CycleReport::Failed(e) => {
            tracing::error!(error = %e, "manual reddit check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to execute Reddit check.",
            )
        }
    }
}

#[derive(serde::Serialize)]
struct PostView {
    title: String,
    url: String,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

#[derive(serde::Serialize)]
struct ErrorOut {
    error: &'static str,
    #[serde(rename = "errorDetails")]
    error_details: &'static str,
}

async fn fetch_posts(State(state): State<AppState>) -> Response {
    let settings = state.relay.settings();
    match state.relay.list_recent().await {
        Ok(posts) => {
            let out = posts
                .iter()
                .map(|p| {
                    let m = DispatchMessage::from_post(p, &settings.permalink_base, &settings.footer);
                    PostView {
                        title: m.title,
                        url: m.url,
                        image_url: m.image_url,
                    }
                })
                .collect::<Vec<_>>();
            Json(out).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "error fetching posts");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorOut {
                    error: "Failed to fetch posts",
                    error_details: e.kind(),
                }),
            )
                .into_response()
        }
    }
}

async fn gpt(State(state): State<AppState>, Path(text): Path<String>) -> (StatusCode, String) {
    let Some(chat) = state.chat.as_ref() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Chat is disabled.".to_string());
    };

    tracing::info!(chars = text.chars().count(), "chat prompt received");
    match chat.reply(&text).await {
        Ok(reply) => (StatusCode::OK, reply),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate a response. Try again later.".to_string(),
        ),
    }
}
