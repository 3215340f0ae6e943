//! Chat entity definitions.

use serde::{Deserialize, Serialize};

/// A conversation between exchange parties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub public_id: String,
    /// Exchange this chat was opened for, when any
    pub exchange_id: Option<i64>,
    /// Participant user ids
    pub participants: Vec<i64>,
    /// Denormalized summary of the most recent message
    pub last_message: Option<LastMessage>,
    pub created_at: String,
    pub updated_at: String,
}

/// Summary kept on the chat row so lists render without loading messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub body: String,
    pub sender_id: i64,
    pub sent_at: String,
}

impl Chat {
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.participants.contains(&user_id)
    }

    /// Participants other than `user_id`.
    pub fn other_participants(&self, user_id: i64) -> Vec<i64> {
        self.participants
            .iter()
            .copied()
            .filter(|&participant| participant != user_id)
            .collect()
    }
}
