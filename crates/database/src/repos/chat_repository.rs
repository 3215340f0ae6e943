//! Chat repository.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::entities::chat::{Chat, LastMessage};
use crate::types::{new_public_id, now_rfc3339, ChatError, ChatResult};

const CHAT_COLUMNS: &str = "id, public_id, exchange_id, last_message_body, \
     last_message_sender_id, last_message_at, created_at, updated_at";

/// Repository for chats and their participant lists.
#[derive(Clone)]
pub struct ChatRepository {
    pool: SqlitePool,
}

impl ChatRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a chat with its participants in one transaction.
    pub async fn create(&self, participants: &[i64], exchange_id: Option<i64>) -> ChatResult<Chat> {
        if participants.len() < 2 {
            return Err(ChatError::ValidationFailed(
                "a chat needs at least two participants".to_string(),
            ));
        }

        let now = now_rfc3339();
        let public_id = new_public_id();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO chats (public_id, exchange_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(exchange_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let chat_id = result.last_insert_rowid();

        for user_id in participants.iter().copied() {
            sqlx::query("INSERT INTO chat_participants (chat_id, user_id, joined_at) VALUES (?, ?, ?)")
                .bind(chat_id)
                .bind(user_id)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.find_by_id(chat_id).await?.ok_or_else(|| {
            ChatError::DatabaseError("failed to read back created chat".to_string())
        })
    }

    pub async fn find_by_id(&self, id: i64) -> ChatResult<Option<Chat>> {
        let row = sqlx::query(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> ChatResult<Option<Chat>> {
        let row = sqlx::query(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Chats a user participates in, most recently active first.
    pub async fn find_for_user(&self, user_id: i64) -> ChatResult<Vec<Chat>> {
        let rows = sqlx::query(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats \
             WHERE id IN (SELECT chat_id FROM chat_participants WHERE user_id = ?) \
             ORDER BY COALESCE(last_message_at, created_at) DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in &rows {
            chats.push(self.hydrate(row).await?);
        }
        Ok(chats)
    }

    /// Refresh the denormalized last-message summary.
    pub async fn set_last_message(&self, chat_id: i64, summary: &LastMessage) -> ChatResult<()> {
        let result = sqlx::query(
            "UPDATE chats SET last_message_body = ?, last_message_sender_id = ?, \
             last_message_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&summary.body)
        .bind(summary.sender_id)
        .bind(&summary.sent_at)
        .bind(now_rfc3339())
        .bind(chat_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::ChatNotFound);
        }
        Ok(())
    }

    async fn hydrate(&self, row: &SqliteRow) -> ChatResult<Chat> {
        let get_err = |e: sqlx::Error| ChatError::DatabaseError(e.to_string());

        let chat_id: i64 = row.try_get("id").map_err(get_err)?;
        let participants: Vec<i64> = sqlx::query_scalar(
            "SELECT user_id FROM chat_participants WHERE chat_id = ? ORDER BY user_id",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        let last_message_body: Option<String> =
            row.try_get("last_message_body").map_err(get_err)?;
        let last_message = match last_message_body {
            Some(body) => Some(LastMessage {
                body,
                sender_id: row
                    .try_get::<Option<i64>, _>("last_message_sender_id")
                    .map_err(get_err)?
                    .unwrap_or_default(),
                sent_at: row
                    .try_get::<Option<String>, _>("last_message_at")
                    .map_err(get_err)?
                    .unwrap_or_default(),
            }),
            None => None,
        };

        Ok(Chat {
            id: chat_id,
            public_id: row.try_get("public_id").map_err(get_err)?,
            exchange_id: row.try_get("exchange_id").map_err(get_err)?,
            participants,
            last_message,
            created_at: row.try_get("created_at").map_err(get_err)?,
            updated_at: row.try_get("updated_at").map_err(get_err)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::UserRepository;
    use crate::test_support::test_pool;

    async fn two_users(pool: &SqlitePool) -> (i64, i64) {
        let users = UserRepository::new(pool.clone());
        let a = users.create(Some("a@example.com"), None).await.unwrap();
        let b = users.create(Some("b@example.com"), None).await.unwrap();
        (a.id, b.id)
    }

    #[tokio::test]
    async fn create_loads_participants() {
        let (pool, _guard) = test_pool().await;
        let (a, b) = two_users(&pool).await;
        let repo = ChatRepository::new(pool);

        let chat = repo.create(&[a, b], None).await.unwrap();
        assert_eq!(chat.participants, vec![a, b]);
        assert!(chat.last_message.is_none());

        let err = repo.create(&[a], None).await.unwrap_err();
        assert!(matches!(err, ChatError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn last_message_summary_round_trip() {
        let (pool, _guard) = test_pool().await;
        let (a, b) = two_users(&pool).await;
        let repo = ChatRepository::new(pool);

        let chat = repo.create(&[a, b], None).await.unwrap();
        let summary = LastMessage {
            body: "see you at the market".to_string(),
            sender_id: a,
            sent_at: now_rfc3339(),
        };
        repo.set_last_message(chat.id, &summary).await.unwrap();

        let reloaded = repo.find_by_id(chat.id).await.unwrap().unwrap();
        assert_eq!(reloaded.last_message, Some(summary));
    }

    #[tokio::test]
    async fn user_chat_list_orders_by_activity() {
        let (pool, _guard) = test_pool().await;
        let (a, b) = two_users(&pool).await;
        let repo = ChatRepository::new(pool);

        let first = repo.create(&[a, b], None).await.unwrap();
        let second = repo.create(&[a, b], None).await.unwrap();

        // Activity on the first chat moves it to the top.
        repo.set_last_message(
            first.id,
            &LastMessage {
                body: "ping".to_string(),
                sender_id: b,
                sent_at: "2999-01-01T00:00:00+00:00".to_string(),
            },
        )
        .await
        .unwrap();

        let chats = repo.find_for_user(a).await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].id, first.id);
        assert_eq!(chats[1].id, second.id);

        assert!(repo.find_for_user(999).await.unwrap().is_empty());
    }
}
