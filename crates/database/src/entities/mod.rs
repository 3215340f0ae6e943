//! Domain entities stored in the marketplace database.

pub mod chat;
pub mod exchange;
pub mod message;
pub mod notification;
pub mod product;
pub mod user;

pub use chat::{Chat, LastMessage};
pub use exchange::{Exchange, ExchangeOffer, ExchangeParty, ExchangeReview, ExchangeStatus};
pub use message::{ChatMessage, CreateMessageRequest};
pub use notification::{CreateNotificationRequest, Notification, NotificationKind};
pub use product::{
    CreateProductRequest, ListingFlags, Product, ProductCategory, ProductStatus, TransactionKind,
    UpdateProductRequest,
};
pub use user::{
    level_for_points, Reputation, UpdateProfileRequest, User, UserLocation, UserPreferences,
    UserStatus,
};
