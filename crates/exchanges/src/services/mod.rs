//! Business logic for exchanges and their chats.

pub mod chat_service;
pub mod exchange_service;

pub use chat_service::ChatService;
pub use exchange_service::ExchangeService;
