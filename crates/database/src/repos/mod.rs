//! Data access layer: one repository per collection.

pub mod chat_repository;
pub mod exchange_repository;
pub mod message_repository;
pub mod notification_repository;
pub mod product_repository;
pub mod user_repository;

pub use chat_repository::ChatRepository;
pub use exchange_repository::ExchangeRepository;
pub use message_repository::MessageRepository;
pub use notification_repository::NotificationRepository;
pub use product_repository::ProductRepository;
pub use user_repository::UserRepository;
