//! Exchange negotiation and the chats it opens: offers, status transitions,
//! per-party reviews feeding reputation, and participant-checked messaging.

pub mod services;

pub use services::chat_service::ChatService;
pub use services::exchange_service::ExchangeService;
