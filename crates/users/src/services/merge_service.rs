//! Deferred account merge.
//!
//! A Google sign-in that collided with a password account leaves a marker in
//! `pending_merges`; this service finishes the job: copy the old account's
//! profile aggregates onto the new record, rewrite every reference to the old
//! user across products, exchanges, chats, messages and notifications, then
//! delete the old identity. The whole merge runs in one transaction, so a
//! failed step leaves both accounts untouched.

use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::types::MergeError;

/// What a completed merge touched.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub old_user_id: i64,
    pub new_user_id: i64,
    pub products_moved: u64,
    pub exchanges_moved: u64,
    pub chats_moved: u64,
    pub notifications_moved: u64,
}

/// Service completing deferred account merges.
pub struct AccountMergeService {
    pool: SqlitePool,
}

impl AccountMergeService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether a merge is pending for this (new) account.
    pub async fn has_pending(&self, new_user_id: i64) -> Result<bool, MergeError> {
        let row = sqlx::query("SELECT 1 FROM pending_merges WHERE new_user_id = ?")
            .bind(new_user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Complete the merge pending for `new_user_id`, if any.
    ///
    /// Returns `Ok(None)` when there is nothing to do.
    pub async fn complete_for(&self, new_user_id: i64) -> Result<Option<MergeReport>, MergeError> {
        let marker = sqlx::query(
            "SELECT id, email, old_user_id FROM pending_merges WHERE new_user_id = ?",
        )
        .bind(new_user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(marker) = marker else {
            return Ok(None);
        };

        let marker_id: i64 = marker.try_get("id")?;
        let email: String = marker.try_get("email")?;
        let old_user_id: i64 = marker.try_get("old_user_id")?;

        let mut tx = self.pool.begin().await?;

        // Copy forward the old account's profile aggregates. Old values win
        // when present; the new record is freshly created and carries nothing
        // worth keeping.
        let old = sqlx::query(
            "SELECT display_name, avatar_url, bio, onboarded, reputation_average, \
             review_count, points, level, badges FROM users WHERE id = ?",
        )
        .bind(old_user_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE users SET \
             display_name = COALESCE(?, display_name), \
             avatar_url = COALESCE(?, avatar_url), \
             bio = COALESCE(?, bio), \
             onboarded = ?, reputation_average = ?, review_count = ?, \
             points = ?, level = ?, badges = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(old.try_get::<Option<String>, _>("display_name")?)
        .bind(old.try_get::<Option<String>, _>("avatar_url")?)
        .bind(old.try_get::<Option<String>, _>("bio")?)
        .bind(old.try_get::<bool, _>("onboarded")?)
        .bind(old.try_get::<f64, _>("reputation_average")?)
        .bind(old.try_get::<i64, _>("review_count")?)
        .bind(old.try_get::<i64, _>("points")?)
        .bind(old.try_get::<i64, _>("level")?)
        .bind(old.try_get::<String, _>("badges")?)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(new_user_id)
        .execute(&mut *tx)
        .await?;

        // Rewrite every reference from the old id to the new one.
        let products_moved = sqlx::query("UPDATE products SET user_id = ? WHERE user_id = ?")
            .bind(new_user_id)
            .bind(old_user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let as_requester = sqlx::query("UPDATE exchanges SET requester_id = ? WHERE requester_id = ?")
            .bind(new_user_id)
            .bind(old_user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let as_owner = sqlx::query("UPDATE exchanges SET owner_id = ? WHERE owner_id = ?")
            .bind(new_user_id)
            .bind(old_user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let chats_moved = sqlx::query(
            "UPDATE OR IGNORE chat_participants SET user_id = ? WHERE user_id = ?",
        )
        .bind(new_user_id)
        .bind(old_user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        // Leftovers only exist when both accounts already shared a chat.
        sqlx::query("DELETE FROM chat_participants WHERE user_id = ?")
            .bind(old_user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE chats SET last_message_sender_id = ? WHERE last_message_sender_id = ?")
            .bind(new_user_id)
            .bind(old_user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE messages SET sender_id = ? WHERE sender_id = ?")
            .bind(new_user_id)
            .bind(old_user_id)
            .execute(&mut *tx)
            .await?;

        let notifications_moved =
            sqlx::query("UPDATE notifications SET recipient_id = ? WHERE recipient_id = ?")
                .bind(new_user_id)
                .bind(old_user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        sqlx::query("UPDATE notifications SET sender_id = ? WHERE sender_id = ?")
            .bind(new_user_id)
            .bind(old_user_id)
            .execute(&mut *tx)
            .await?;

        // Retire the old identity and hand its email to the new record. The
        // marker goes first so no foreign key still points at the old row.
        sqlx::query("DELETE FROM pending_merges WHERE id = ?")
            .bind(marker_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_identities WHERE user_id = ?")
            .bind(old_user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(old_user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(old_user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE users SET email = ? WHERE id = ?")
            .bind(&email)
            .bind(new_user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let report = MergeReport {
            old_user_id,
            new_user_id,
            products_moved,
            exchanges_moved: as_requester + as_owner,
            chats_moved,
            notifications_moved,
        };

        info!(
            old_user = old_user_id,
            new_user = new_user_id,
            products = report.products_moved,
            exchanges = report.exchanges_moved,
            "completed account merge"
        );

        Ok(Some(report))
    }
}
