//! Chat message entity definitions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub public_id: String,
    pub chat_id: i64,
    pub sender_id: i64,
    pub body: String,
    pub created_at: String,
}

/// Request to append a message to a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    pub chat_id: i64,
    pub sender_id: i64,
    pub body: String,
}

impl CreateMessageRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.body.trim().is_empty() {
            return Err("message body cannot be empty".to_string());
        }
        if self.body.len() > 4000 {
            return Err("message body too long (max 4000 characters)".to_string());
        }
        Ok(())
    }
}
