//! Shared types and helpers for the storage layer.

pub mod errors;

pub use errors::{
    ChatError, ChatResult, DatabaseError, DatabaseResult, ExchangeError, ExchangeResult,
    NotificationError, NotificationResult, ProductError, ProductResult, UserError, UserResult,
};

/// Generate a collision-resistant public identifier.
pub fn new_public_id() -> String {
    cuid2::create_id()
}

/// Current instant as the RFC 3339 string stored in every timestamp column.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
