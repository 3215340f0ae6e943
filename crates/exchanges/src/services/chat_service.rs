//! Participant-checked messaging.

use sqlx::SqlitePool;

use gardenswap_database::{
    Chat, ChatError, ChatMessage, ChatRepository, ChatResult, CreateMessageRequest,
    CreateNotificationRequest, MessageRepository, NotificationKind,
};
use gardenswap_users::NotificationService;

/// Service for chats opened by exchanges.
pub struct ChatService {
    chats: ChatRepository,
    messages: MessageRepository,
    notifications: NotificationService,
}

impl ChatService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            chats: ChatRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            notifications: NotificationService::new(pool),
        }
    }

    /// A user's chats, most recently active first.
    pub async fn chats_for(&self, user_id: i64) -> ChatResult<Vec<Chat>> {
        self.chats.find_for_user(user_id).await
    }

    /// A chat, if the user participates in it.
    pub async fn get(&self, user_id: i64, public_id: &str) -> ChatResult<Chat> {
        let chat = self
            .chats
            .find_by_public_id(public_id)
            .await?
            .ok_or(ChatError::ChatNotFound)?;

        if !chat.has_participant(user_id) {
            return Err(ChatError::NotAParticipant);
        }
        Ok(chat)
    }

    /// Message history in send order.
    pub async fn history(
        &self,
        user_id: i64,
        public_id: &str,
        limit: u32,
        offset: u32,
    ) -> ChatResult<Vec<ChatMessage>> {
        let chat = self.get(user_id, public_id).await?;
        self.messages.find_by_chat(chat.id, limit, offset).await
    }

    /// Append a message; the chat's last-message summary is refreshed and
    /// the other participants get a best-effort notification.
    pub async fn send_message(
        &self,
        sender_id: i64,
        public_id: &str,
        body: String,
    ) -> ChatResult<ChatMessage> {
        let chat = self.get(sender_id, public_id).await?;

        let request = CreateMessageRequest {
            chat_id: chat.id,
            sender_id,
            body,
        };
        if let Err(reason) = request.validate() {
            return Err(ChatError::ValidationFailed(reason));
        }

        let message = self.messages.create(&request).await?;

        for recipient in chat.other_participants(sender_id) {
            self.notifications
                .dispatch(CreateNotificationRequest::about(
                    recipient,
                    sender_id,
                    NotificationKind::Message,
                    chat.public_id.clone(),
                    "chat",
                ))
                .await;
        }

        Ok(message)
    }
}
