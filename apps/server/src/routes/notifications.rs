//! Notification inbox endpoints.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use gardenswap_database::Notification;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/:id/read", post(mark_read))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Debug, Serialize)]
struct InboxResponse {
    notifications: Vec<NotificationResponse>,
    unread: i64,
}

#[derive(Debug, Serialize)]
struct NotificationResponse {
    id: String,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sender_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    related_entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    related_entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
    is_read: bool,
    created_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.public_id,
            kind: notification.kind.as_str().to_string(),
            sender_id: notification.sender_id,
            related_entity_id: notification.related_entity_id,
            related_entity_type: notification.related_entity_type,
            metadata: notification.metadata,
            is_read: notification.is_read,
            created_at: notification.created_at,
        }
    }
}

async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> Result<Json<InboxResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;

    let notifications = state
        .notifications
        .list(
            user.id,
            page.limit.unwrap_or(50).min(200),
            page.offset.unwrap_or(0),
        )
        .await?;
    let unread = state.notifications.unread_count(user.id).await?;

    Ok(Json(InboxResponse {
        notifications: notifications.into_iter().map(Into::into).collect(),
        unread,
    }))
}

async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let notification = state.notifications.mark_read(&public_id, user.id).await?;
    Ok(Json(notification.into()))
}

async fn mark_all_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let user = state.authenticate(&headers).await?;
    state.notifications.mark_all_read(user.id).await?;
    Ok(())
}
