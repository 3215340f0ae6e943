//! REST endpoints.

pub mod auth;
pub mod chats;
pub mod exchanges;
pub mod notifications;
pub mod products;
pub mod profile;

use axum::Router;

use crate::state::AppState;

/// Assemble the full route table.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(products::routes())
        .merge(exchanges::routes())
        .merge(chats::routes())
        .merge(notifications::routes())
        .merge(profile::routes())
}
