//! Chat endpoints.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use gardenswap_database::{Chat, ChatMessage, LastMessage};

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/chats", get(list_chats))
        .route(
            "/api/chats/:id/messages",
            get(list_messages).post(send_message),
        )
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SendMessageBody {
    body: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    id: String,
    participants: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_message: Option<LastMessage>,
    created_at: String,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.public_id,
            participants: chat.participants,
            last_message: chat.last_message,
            created_at: chat.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    id: String,
    sender_id: i64,
    body: String,
    created_at: String,
}

impl From<ChatMessage> for MessageResponse {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.public_id,
            sender_id: message.sender_id,
            body: message.body,
            created_at: message.created_at,
        }
    }
}

async fn list_chats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatResponse>>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let chats = state.chats.chats_for(user.id).await?;
    Ok(Json(chats.into_iter().map(Into::into).collect()))
}

async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let messages = state
        .chats
        .history(
            user.id,
            &public_id,
            page.limit.unwrap_or(100).min(500),
            page.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
    Json(payload): Json<SendMessageBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let message = state
        .chats
        .send_message(user.id, &public_id, payload.body)
        .await?;
    Ok(Json(message.into()))
}
