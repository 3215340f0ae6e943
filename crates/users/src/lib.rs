//! User-facing services: profiles with geolocated addresses, notification
//! delivery, the deferred account merge, and account deletion.

pub mod services;
pub mod types;

pub use services::account_service::AccountService;
pub use services::merge_service::{AccountMergeService, MergeReport};
pub use services::notification_service::NotificationService;
pub use services::profile_service::ProfileService;
pub use types::{AccountError, MergeError};
