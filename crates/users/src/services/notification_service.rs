//! Notification delivery and inbox management.

use sqlx::SqlitePool;
use tracing::warn;

use gardenswap_database::{
    CreateNotificationRequest, Notification, NotificationRepository, NotificationResult,
};

/// Service for the notification inbox.
#[derive(Clone)]
pub struct NotificationService {
    notifications: NotificationRepository,
}

impl NotificationService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            notifications: NotificationRepository::new(pool),
        }
    }

    /// Best-effort delivery: a failed insert is logged and swallowed so the
    /// action that triggered the notification still succeeds.
    pub async fn dispatch(&self, request: CreateNotificationRequest) {
        if let Err(error) = self.notifications.create(&request).await {
            warn!(
                recipient = request.recipient_id,
                kind = request.kind.as_str(),
                %error,
                "notification dispatch failed"
            );
        }
    }

    pub async fn list(
        &self,
        recipient_id: i64,
        limit: u32,
        offset: u32,
    ) -> NotificationResult<Vec<Notification>> {
        self.notifications
            .find_by_recipient(recipient_id, limit, offset)
            .await
    }

    pub async fn unread_count(&self, recipient_id: i64) -> NotificationResult<i64> {
        self.notifications.unread_count(recipient_id).await
    }

    pub async fn mark_read(
        &self,
        public_id: &str,
        recipient_id: i64,
    ) -> NotificationResult<Notification> {
        self.notifications.mark_read(public_id, recipient_id).await
    }

    pub async fn mark_all_read(&self, recipient_id: i64) -> NotificationResult<u64> {
        self.notifications.mark_all_read(recipient_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gardenswap_config::DatabaseConfig;
    use gardenswap_database::{initialize_database, NotificationKind, UserRepository};
    use tempfile::TempDir;

    async fn service_with_user() -> (NotificationService, i64, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("inbox.db").display()),
            max_connections: 2,
        };
        let pool = initialize_database(&config).await.unwrap();
        let user = UserRepository::new(pool.clone())
            .create(Some("inbox@example.com"), None)
            .await
            .unwrap();

        (NotificationService::new(pool), user.id, temp_dir)
    }

    #[tokio::test]
    async fn dispatch_then_read_flow() {
        let (service, recipient, _guard) = service_with_user().await;

        service
            .dispatch(CreateNotificationRequest {
                recipient_id: recipient,
                sender_id: None,
                kind: NotificationKind::System,
                related_entity_id: None,
                related_entity_type: None,
                metadata: None,
            })
            .await;

        assert_eq!(service.unread_count(recipient).await.unwrap(), 1);

        let inbox = service.list(recipient, 10, 0).await.unwrap();
        assert_eq!(inbox.len(), 1);

        service
            .mark_read(&inbox[0].public_id, recipient)
            .await
            .unwrap();
        assert_eq!(service.unread_count(recipient).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        let (service, _recipient, _guard) = service_with_user().await;

        // Invalid recipient: create fails, dispatch only logs.
        service
            .dispatch(CreateNotificationRequest {
                recipient_id: -1,
                sender_id: None,
                kind: NotificationKind::System,
                related_entity_id: None,
                related_entity_type: None,
                metadata: None,
            })
            .await;
    }
}
