//! GardenSwap storage layer.
//!
//! Connection management, embedded migrations, the entity definitions for
//! every collection, and one repository per collection.

use sqlx::SqlitePool;

use gardenswap_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

pub use repos::{
    ChatRepository, ExchangeRepository, MessageRepository, NotificationRepository,
    ProductRepository, UserRepository,
};

pub use entities::{
    chat::{Chat, LastMessage},
    exchange::{Exchange, ExchangeOffer, ExchangeParty, ExchangeReview, ExchangeStatus},
    message::{ChatMessage, CreateMessageRequest},
    notification::{CreateNotificationRequest, Notification, NotificationKind},
    product::{
        CreateProductRequest, ListingFlags, Product, ProductCategory, ProductStatus,
        TransactionKind, UpdateProductRequest,
    },
    user::{
        level_for_points, Reputation, UpdateProfileRequest, User, UserLocation, UserPreferences,
        UserStatus,
    },
};

pub use types::{
    new_public_id, now_rfc3339, ChatError, ChatResult, DatabaseError, DatabaseResult,
    ExchangeError, ExchangeResult, NotificationError, NotificationResult, ProductError,
    ProductResult, UserError, UserResult,
};

/// Open the database and bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}
