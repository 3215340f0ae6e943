use serde::{Deserialize, Serialize};

/// An in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Database primary key
    pub id: i64,
    /// Publicly accessible identifier
    pub public_id: String,
    pub recipient_id: i64,
    /// User whose action triggered the notification, when any
    pub sender_id: Option<i64>,
    pub kind: NotificationKind,
    /// Public id of the related entity, when any
    pub related_entity_id: Option<String>,
    pub related_entity_type: Option<String>,
    /// Free-form payload the client may render
    pub metadata: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: String,
    pub read_at: Option<String>,
}

/// Notification type tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ExchangeRequested,
    ExchangeAccepted,
    ExchangeRejected,
    ExchangeCompleted,
    ReviewReceived,
    Message,
    AccountMerged,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ExchangeRequested => "exchange_requested",
            NotificationKind::ExchangeAccepted => "exchange_accepted",
            NotificationKind::ExchangeRejected => "exchange_rejected",
            NotificationKind::ExchangeCompleted => "exchange_completed",
            NotificationKind::ReviewReceived => "review_received",
            NotificationKind::Message => "message",
            NotificationKind::AccountMerged => "account_merged",
            NotificationKind::System => "system",
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(s: &str) -> Self {
        match s {
            "exchange_requested" => NotificationKind::ExchangeRequested,
            "exchange_accepted" => NotificationKind::ExchangeAccepted,
            "exchange_rejected" => NotificationKind::ExchangeRejected,
            "exchange_completed" => NotificationKind::ExchangeCompleted,
            "review_received" => NotificationKind::ReviewReceived,
            "message" => NotificationKind::Message,
            "account_merged" => NotificationKind::AccountMerged,
            _ => NotificationKind::System,
        }
    }
}

/// Request to create a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotificationRequest {
    pub recipient_id: i64,
    pub sender_id: Option<i64>,
    pub kind: NotificationKind,
    pub related_entity_id: Option<String>,
    pub related_entity_type: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl CreateNotificationRequest {
    /// Notification about an entity, without extra metadata.
    pub fn about(
        recipient_id: i64,
        sender_id: i64,
        kind: NotificationKind,
        entity_id: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> Self {
        Self {
            recipient_id,
            sender_id: Some(sender_id),
            kind,
            related_entity_id: Some(entity_id.into()),
            related_entity_type: Some(entity_type.into()),
            metadata: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.recipient_id <= 0 {
            return Err("invalid recipient".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trip() {
        let kinds = [
            NotificationKind::ExchangeRequested,
            NotificationKind::ExchangeAccepted,
            NotificationKind::ExchangeRejected,
            NotificationKind::ExchangeCompleted,
            NotificationKind::ReviewReceived,
            NotificationKind::Message,
            NotificationKind::AccountMerged,
            NotificationKind::System,
        ];

        for kind in kinds {
            assert_eq!(NotificationKind::from(kind.as_str()), kind);
        }
        assert_eq!(NotificationKind::from("whatever"), NotificationKind::System);
    }

    #[test]
    fn about_fills_relations() {
        let request = CreateNotificationRequest::about(
            5,
            9,
            NotificationKind::ExchangeRequested,
            "x123",
            "exchange",
        );

        assert_eq!(request.recipient_id, 5);
        assert_eq!(request.sender_id, Some(9));
        assert_eq!(request.related_entity_id.as_deref(), Some("x123"));
        assert_eq!(request.related_entity_type.as_deref(), Some("exchange"));
        assert!(request.validate().is_ok());
    }
}
