//! Notification repository.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::entities::notification::{CreateNotificationRequest, Notification, NotificationKind};
use crate::types::{new_public_id, now_rfc3339, NotificationError, NotificationResult};

const NOTIFICATION_COLUMNS: &str = "id, public_id, recipient_id, sender_id, kind, \
     related_entity_id, related_entity_type, metadata, is_read, created_at, read_at";

/// Repository for notification rows.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        request: &CreateNotificationRequest,
    ) -> NotificationResult<Notification> {
        if let Err(reason) = request.validate() {
            return Err(NotificationError::ValidationFailed(reason));
        }

        let now = now_rfc3339();
        let public_id = new_public_id();
        let metadata = request
            .metadata
            .as_ref()
            .map(|value| serde_json::to_string(value))
            .transpose()
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO notifications (public_id, recipient_id, sender_id, kind, \
             related_entity_id, related_entity_type, metadata, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.recipient_id)
        .bind(request.sender_id)
        .bind(request.kind.as_str())
        .bind(request.related_entity_id.as_deref())
        .bind(request.related_entity_type.as_deref())
        .bind(metadata.as_deref())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let notification_id = result.last_insert_rowid();
        self.find_by_id(notification_id).await?.ok_or_else(|| {
            NotificationError::DatabaseError("failed to read back created notification".to_string())
        })
    }

    pub async fn find_by_id(&self, id: i64) -> NotificationResult<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_notification).transpose()
    }

    /// A recipient's notifications, newest first.
    pub async fn find_by_recipient(
        &self,
        recipient_id: i64,
        limit: u32,
        offset: u32,
    ) -> NotificationResult<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE recipient_id = ? \
             ORDER BY id DESC LIMIT ? OFFSET ?"
        ))
        .bind(recipient_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_notification).collect()
    }

    pub async fn unread_count(&self, recipient_id: i64) -> NotificationResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND is_read = 0",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Mark one notification read; the recipient check prevents users from
    /// touching each other's notifications.
    pub async fn mark_read(
        &self,
        public_id: &str,
        recipient_id: i64,
    ) -> NotificationResult<Notification> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1, read_at = ? \
             WHERE public_id = ? AND recipient_id = ?",
        )
        .bind(now_rfc3339())
        .bind(public_id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::NotificationNotFound);
        }

        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_one(&self.pool)
        .await?;

        map_notification(&row)
    }

    pub async fn mark_all_read(&self, recipient_id: i64) -> NotificationResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1, read_at = ? \
             WHERE recipient_id = ? AND is_read = 0",
        )
        .bind(now_rfc3339())
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Drop everything addressed to a departing user.
    pub async fn delete_for_recipient(&self, recipient_id: i64) -> NotificationResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE recipient_id = ?")
            .bind(recipient_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn map_notification(row: &SqliteRow) -> NotificationResult<Notification> {
    let get_err = |e: sqlx::Error| NotificationError::DatabaseError(e.to_string());

    let metadata_json: Option<String> = row.try_get("metadata").map_err(get_err)?;
    let metadata = metadata_json.and_then(|value| serde_json::from_str(&value).ok());

    Ok(Notification {
        id: row.try_get("id").map_err(get_err)?,
        public_id: row.try_get("public_id").map_err(get_err)?,
        recipient_id: row.try_get("recipient_id").map_err(get_err)?,
        sender_id: row.try_get("sender_id").map_err(get_err)?,
        kind: NotificationKind::from(row.try_get::<String, _>("kind").map_err(get_err)?.as_str()),
        related_entity_id: row.try_get("related_entity_id").map_err(get_err)?,
        related_entity_type: row.try_get("related_entity_type").map_err(get_err)?,
        metadata,
        is_read: row.try_get("is_read").map_err(get_err)?,
        created_at: row.try_get("created_at").map_err(get_err)?,
        read_at: row.try_get("read_at").map_err(get_err)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::UserRepository;
    use crate::test_support::test_pool;

    async fn seeded_user(pool: &SqlitePool) -> i64 {
        UserRepository::new(pool.clone())
            .create(Some("n@example.com"), None)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_list_and_read_flow() {
        let (pool, _guard) = test_pool().await;
        let recipient = seeded_user(&pool).await;
        let repo = NotificationRepository::new(pool);

        let first = repo
            .create(&CreateNotificationRequest {
                recipient_id: recipient,
                sender_id: None,
                kind: NotificationKind::System,
                related_entity_id: None,
                related_entity_type: None,
                metadata: Some(serde_json::json!({ "reason": "welcome" })),
            })
            .await
            .unwrap();

        let second = repo
            .create(&CreateNotificationRequest::about(
                recipient,
                recipient,
                NotificationKind::ExchangeRequested,
                "x9",
                "exchange",
            ))
            .await
            .unwrap();

        let list = repo.find_by_recipient(recipient, 10, 0).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id, "newest first");

        assert_eq!(repo.unread_count(recipient).await.unwrap(), 2);

        let read = repo.mark_read(&first.public_id, recipient).await.unwrap();
        assert!(read.is_read);
        assert!(read.read_at.is_some());
        assert_eq!(repo.unread_count(recipient).await.unwrap(), 1);

        assert_eq!(repo.mark_all_read(recipient).await.unwrap(), 1);
        assert_eq!(repo.unread_count(recipient).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_read_checks_the_recipient() {
        let (pool, _guard) = test_pool().await;
        let recipient = seeded_user(&pool).await;
        let repo = NotificationRepository::new(pool);

        let notification = repo
            .create(&CreateNotificationRequest {
                recipient_id: recipient,
                sender_id: None,
                kind: NotificationKind::System,
                related_entity_id: None,
                related_entity_type: None,
                metadata: None,
            })
            .await
            .unwrap();

        let err = repo
            .mark_read(&notification.public_id, recipient + 1)
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::NotificationNotFound));
    }

    #[tokio::test]
    async fn delete_for_recipient_clears_the_inbox() {
        let (pool, _guard) = test_pool().await;
        let recipient = seeded_user(&pool).await;
        let repo = NotificationRepository::new(pool);

        for _ in 0..3 {
            repo.create(&CreateNotificationRequest {
                recipient_id: recipient,
                sender_id: None,
                kind: NotificationKind::System,
                related_entity_id: None,
                related_entity_type: None,
                metadata: None,
            })
            .await
            .unwrap();
        }

        assert_eq!(repo.delete_for_recipient(recipient).await.unwrap(), 3);
        assert!(repo.find_by_recipient(recipient, 10, 0).await.unwrap().is_empty());
    }
}
