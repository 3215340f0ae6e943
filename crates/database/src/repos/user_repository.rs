//! User repository.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::entities::user::{
    level_for_points, Reputation, UpdateProfileRequest, User, UserLocation, UserPreferences,
    UserStatus,
};
use crate::types::{new_public_id, now_rfc3339, UserError, UserResult};

const USER_COLUMNS: &str = "id, public_id, email, display_name, avatar_url, bio, \
     latitude, longitude, geohash, display_latitude, display_longitude, approximate_address, \
     reputation_average, review_count, points, level, badges, onboarded, \
     notify_exchanges, notify_messages, share_exact_location, status, created_at, updated_at";

/// Repository for user rows.
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

enum Arg {
    Text(String),
    Bool(bool),
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ? AND status != 'deleted'"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> UserResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE public_id = ? AND status != 'deleted'"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? AND status != 'deleted'"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    /// Insert a bare user row; profile fields are filled in later through
    /// [`UserRepository::update_profile`].
    pub async fn create(
        &self,
        email: Option<&str>,
        display_name: Option<&str>,
    ) -> UserResult<User> {
        let now = now_rfc3339();
        let public_id = new_public_id();

        let result = sqlx::query(
            "INSERT INTO users (public_id, email, display_name, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(email)
        .bind(display_name)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let user_id = result.last_insert_rowid();
        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| UserError::DatabaseError("failed to read back created user".to_string()))
    }

    /// Apply a partial profile update.
    pub async fn update_profile(
        &self,
        user_id: i64,
        request: &UpdateProfileRequest,
    ) -> UserResult<User> {
        if request.is_empty() {
            return self.find_by_id(user_id).await?.ok_or(UserError::UserNotFound);
        }

        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Arg> = Vec::new();

        if let Some(ref display_name) = request.display_name {
            clauses.push("display_name = ?");
            args.push(Arg::Text(display_name.clone()));
        }
        if let Some(ref avatar_url) = request.avatar_url {
            clauses.push("avatar_url = ?");
            args.push(Arg::Text(avatar_url.clone()));
        }
        if let Some(ref bio) = request.bio {
            clauses.push("bio = ?");
            args.push(Arg::Text(bio.clone()));
        }
        if let Some(onboarded) = request.onboarded {
            clauses.push("onboarded = ?");
            args.push(Arg::Bool(onboarded));
        }
        if let Some(notify_exchanges) = request.notify_exchanges {
            clauses.push("notify_exchanges = ?");
            args.push(Arg::Bool(notify_exchanges));
        }
        if let Some(notify_messages) = request.notify_messages {
            clauses.push("notify_messages = ?");
            args.push(Arg::Bool(notify_messages));
        }
        if let Some(share_exact_location) = request.share_exact_location {
            clauses.push("share_exact_location = ?");
            args.push(Arg::Bool(share_exact_location));
        }

        clauses.push("updated_at = ?");
        args.push(Arg::Text(now_rfc3339()));

        let sql = format!(
            "UPDATE users SET {} WHERE id = ? AND status != 'deleted'",
            clauses.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for arg in args {
            query = match arg {
                Arg::Text(value) => query.bind(value),
                Arg::Bool(value) => query.bind(value),
            };
        }

        let result = query.bind(user_id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound);
        }

        self.find_by_id(user_id).await?.ok_or(UserError::UserNotFound)
    }

    /// Store a user's location: exact coordinates, geohash, fuzzed display
    /// coordinates, and the approximate address.
    pub async fn set_location(&self, user_id: i64, location: &UserLocation) -> UserResult<User> {
        let result = sqlx::query(
            "UPDATE users SET latitude = ?, longitude = ?, geohash = ?, \
             display_latitude = ?, display_longitude = ?, approximate_address = ?, updated_at = ? \
             WHERE id = ? AND status != 'deleted'",
        )
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(&location.geohash)
        .bind(location.display_latitude)
        .bind(location.display_longitude)
        .bind(location.approximate_address.as_deref())
        .bind(now_rfc3339())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound);
        }

        self.find_by_id(user_id).await?.ok_or(UserError::UserNotFound)
    }

    /// Fold a received review rating into the user's reputation aggregate.
    pub async fn apply_review(&self, user_id: i64, rating: u8) -> UserResult<Reputation> {
        let user = self.find_by_id(user_id).await?.ok_or(UserError::UserNotFound)?;
        let reputation = user.reputation.apply_rating(rating);

        sqlx::query(
            "UPDATE users SET reputation_average = ?, review_count = ?, updated_at = ? WHERE id = ?",
        )
        .bind(reputation.average)
        .bind(reputation.review_count)
        .bind(now_rfc3339())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(reputation)
    }

    /// Award activity points and recompute the level.
    pub async fn add_points(&self, user_id: i64, delta: i64) -> UserResult<User> {
        let user = self.find_by_id(user_id).await?.ok_or(UserError::UserNotFound)?;
        let points = user.points + delta;
        let level = level_for_points(points);

        sqlx::query("UPDATE users SET points = ?, level = ?, updated_at = ? WHERE id = ?")
            .bind(points)
            .bind(level)
            .bind(now_rfc3339())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        self.find_by_id(user_id).await?.ok_or(UserError::UserNotFound)
    }
}

/// Map a row onto the [`User`] entity.
pub(crate) fn map_user(row: &SqliteRow) -> UserResult<User> {
    let badges_json: String = row
        .try_get("badges")
        .map_err(|e| UserError::DatabaseError(e.to_string()))?;
    let badges: Vec<String> = serde_json::from_str(&badges_json).unwrap_or_default();

    let latitude: Option<f64> = row
        .try_get("latitude")
        .map_err(|e| UserError::DatabaseError(e.to_string()))?;
    let longitude: Option<f64> = row
        .try_get("longitude")
        .map_err(|e| UserError::DatabaseError(e.to_string()))?;

    let location = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(UserLocation {
            latitude,
            longitude,
            geohash: row
                .try_get::<Option<String>, _>("geohash")
                .map_err(|e| UserError::DatabaseError(e.to_string()))?
                .unwrap_or_default(),
            display_latitude: row
                .try_get::<Option<f64>, _>("display_latitude")
                .map_err(|e| UserError::DatabaseError(e.to_string()))?
                .unwrap_or(latitude),
            display_longitude: row
                .try_get::<Option<f64>, _>("display_longitude")
                .map_err(|e| UserError::DatabaseError(e.to_string()))?
                .unwrap_or(longitude),
            approximate_address: row
                .try_get("approximate_address")
                .map_err(|e| UserError::DatabaseError(e.to_string()))?,
        }),
        _ => None,
    };

    let get_err = |e: sqlx::Error| UserError::DatabaseError(e.to_string());

    Ok(User {
        id: row.try_get("id").map_err(get_err)?,
        public_id: row.try_get("public_id").map_err(get_err)?,
        email: row.try_get("email").map_err(get_err)?,
        display_name: row.try_get("display_name").map_err(get_err)?,
        avatar_url: row.try_get("avatar_url").map_err(get_err)?,
        bio: row.try_get("bio").map_err(get_err)?,
        location,
        reputation: Reputation {
            average: row.try_get("reputation_average").map_err(get_err)?,
            review_count: row.try_get("review_count").map_err(get_err)?,
        },
        points: row.try_get("points").map_err(get_err)?,
        level: row.try_get("level").map_err(get_err)?,
        badges,
        onboarded: row.try_get("onboarded").map_err(get_err)?,
        preferences: UserPreferences {
            notify_exchanges: row.try_get("notify_exchanges").map_err(get_err)?,
            notify_messages: row.try_get("notify_messages").map_err(get_err)?,
            share_exact_location: row.try_get("share_exact_location").map_err(get_err)?,
        },
        status: UserStatus::from(row.try_get::<String, _>("status").map_err(get_err)?.as_str()),
        created_at: row.try_get("created_at").map_err(get_err)?,
        updated_at: row.try_get("updated_at").map_err(get_err)?,
    })
}
