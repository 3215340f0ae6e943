//! Account deletion.

use sqlx::SqlitePool;
use tracing::info;

use crate::types::AccountError;

/// Service removing an account and everything addressed to it.
pub struct AccountService {
    pool: SqlitePool,
}

impl AccountService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Delete an account: soft-delete its products, reject its open
    /// exchanges, drop its notifications, sessions and identities, and
    /// anonymize the user row. Runs in one transaction.
    pub async fn delete_account(&self, user_id: i64) -> Result<(), AccountError> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM users WHERE id = ? AND status != 'deleted'")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AccountError::UserNotFound);
        }

        sqlx::query(
            "UPDATE products SET status = 'deleted', updated_at = ? \
             WHERE user_id = ? AND status = 'active'",
        )
        .bind(&now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE exchanges SET status = 'rejected', updated_at = ? \
             WHERE (requester_id = ? OR owner_id = ?) AND status IN ('pending', 'accepted')",
        )
        .bind(&now)
        .bind(user_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM notifications WHERE recipient_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_identities WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        // Chat history stays; the row is anonymized, not removed, so the
        // other side of old conversations keeps a consistent view.
        sqlx::query(
            "UPDATE users SET email = NULL, display_name = NULL, avatar_url = NULL, bio = NULL, \
             latitude = NULL, longitude = NULL, geohash = NULL, \
             display_latitude = NULL, display_longitude = NULL, approximate_address = NULL, \
             status = 'deleted', updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user = user_id, "account deleted");
        Ok(())
    }
}
