//! Message repository.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::entities::message::{ChatMessage, CreateMessageRequest};
use crate::types::{new_public_id, now_rfc3339, ChatError, ChatResult};

const MESSAGE_COLUMNS: &str = "id, public_id, chat_id, sender_id, body, created_at";

/// Repository for chat messages.
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message and refresh the chat's last-message summary in one
    /// transaction.
    pub async fn create(&self, request: &CreateMessageRequest) -> ChatResult<ChatMessage> {
        let now = now_rfc3339();
        let public_id = new_public_id();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO messages (public_id, chat_id, sender_id, body, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.chat_id)
        .bind(request.sender_id)
        .bind(&request.body)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE chats SET last_message_body = ?, last_message_sender_id = ?, \
             last_message_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&request.body)
        .bind(request.sender_id)
        .bind(&now)
        .bind(&now)
        .bind(request.chat_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let message_id = result.last_insert_rowid();
        self.find_by_id(message_id).await?.ok_or_else(|| {
            ChatError::DatabaseError("failed to read back created message".to_string())
        })
    }

    pub async fn find_by_id(&self, id: i64) -> ChatResult<Option<ChatMessage>> {
        let row = sqlx::query(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_message).transpose()
    }

    /// Messages of a chat in send order.
    pub async fn find_by_chat(
        &self,
        chat_id: i64,
        limit: u32,
        offset: u32,
    ) -> ChatResult<Vec<ChatMessage>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = ? \
             ORDER BY id ASC LIMIT ? OFFSET ?"
        ))
        .bind(chat_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_message).collect()
    }
}

fn map_message(row: &SqliteRow) -> ChatResult<ChatMessage> {
    let get_err = |e: sqlx::Error| ChatError::DatabaseError(e.to_string());

    Ok(ChatMessage {
        id: row.try_get("id").map_err(get_err)?,
        public_id: row.try_get("public_id").map_err(get_err)?,
        chat_id: row.try_get("chat_id").map_err(get_err)?,
        sender_id: row.try_get("sender_id").map_err(get_err)?,
        body: row.try_get("body").map_err(get_err)?,
        created_at: row.try_get("created_at").map_err(get_err)?,
    })
}
