use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agent::Agent;
use crate::conversation::{ConversationStore, DEFAULT_USER_ID, StoreError, SystemPromptManager};

const CHAT_PAGE: &str = include_str!("chat.html");

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub store: Arc<ConversationStore>,
    pub prompts: Arc<SystemPromptManager>,
}

/// Builds the full route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/chat", post(chat))
        .route("/delete", delete(clear_history))
        .route("/delete/{conversation_id}", delete(delete_conversation))
        .route("/delete/{conversation_id}/{idx}", delete(delete_message))
        .route("/history", get(list_history))
        .route("/history/{conversation_id}", get(get_history))
        .route("/set-system-prompt", post(set_system_prompt))
        .route("/get-system-prompt", get(get_system_prompt))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    user_id: Option<String>,
    conversation_id: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptForm {
    user_id: Option<String>,
    #[serde(default)]
    system_prompt: String,
}

async fn home() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn chat(State(state): State<AppState>, Form(form): Form<ChatForm>) -> impl IntoResponse {
    let response = state
        .agent
        .chat(
            &form.message,
            form.conversation_id.as_deref(),
            form.user_id.as_deref(),
        )
        .await;
    Json(json!({ "response": response }))
}

async fn clear_history(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse {
    let user_id = query.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);
    state.store.clear_user(user_id).await;
    Json(json!({ "message": "All conversations deleted for the user" }))
}

async fn delete_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> impl IntoResponse {
    state.store.clear(&conversation_id).await;
    Json(json!({ "message": "Conversation deleted" }))
}

async fn delete_message(
    State(state): State<AppState>,
    Path((conversation_id, idx)): Path<(String, String)>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse {
    let Ok(idx) = idx.parse::<usize>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Index must be an integer" })),
        );
    };
    let user_id = query.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);

    match state.store.truncate(user_id, &conversation_id, idx).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Messages after the given index deleted" })),
        ),
        Err(StoreError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Conversation not found" })),
        ),
        Err(StoreError::InvalidTurnIndex(_)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid index" })),
        ),
    }
}

async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse {
    let user_id = query.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);
    Json(json!(state.store.list_saved(user_id).await))
}

async fn get_history(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse {
    let user_id = query.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);
    let handle = state.store.get_or_create(user_id, &conversation_id).await;
    let messages = handle.lock().await.messages.clone();
    Json(json!(messages))
}

async fn set_system_prompt(
    State(state): State<AppState>,
    Form(form): Form<PromptForm>,
) -> impl IntoResponse {
    let user_id = form.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);
    state.prompts.set(user_id, &form.system_prompt).await;
    Json(json!({ "message": "System prompt updated" }))
}

async fn get_system_prompt(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse {
    let user_id = query.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);
    Json(json!({ "system_prompt": state.prompts.get(user_id).await }))
}
