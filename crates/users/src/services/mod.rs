//! Business logic for the user domain.

pub mod account_service;
pub mod merge_service;
pub mod notification_service;
pub mod profile_service;

pub use account_service::AccountService;
pub use merge_service::AccountMergeService;
pub use notification_service::NotificationService;
pub use profile_service::ProfileService;
