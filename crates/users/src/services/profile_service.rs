//! Profile management.

use sqlx::SqlitePool;
use tracing::info;

use gardenswap_database::{
    UpdateProfileRequest, User, UserError, UserLocation, UserRepository, UserResult,
};
use gardenswap_geo::{
    approximate_address, fuzz_location, geohash, geohash_encode, Coordinates,
};

/// Service for reading and updating user profiles.
pub struct ProfileService {
    users: UserRepository,
}

impl ProfileService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    pub async fn profile(&self, user_id: i64) -> UserResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(UserError::UserNotFound)
    }

    pub async fn profile_by_public_id(&self, public_id: &str) -> UserResult<User> {
        self.users
            .find_by_public_id(public_id)
            .await?
            .ok_or(UserError::UserNotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        request: UpdateProfileRequest,
    ) -> UserResult<User> {
        if let Err(reason) = request.validate() {
            return Err(UserError::ValidationFailed(reason));
        }

        self.users.update_profile(user_id, &request).await
    }

    /// Store a user's location.
    ///
    /// The exact coordinates are kept for the user's own searches; what other
    /// users see is the fuzzed pair and the reduced address, derived here.
    pub async fn set_location(
        &self,
        user_id: i64,
        latitude: f64,
        longitude: f64,
        full_address: Option<&str>,
    ) -> UserResult<User> {
        let coords = Coordinates::new(latitude, longitude);
        if !coords.is_valid() {
            return Err(UserError::InvalidCoordinates);
        }

        let fuzzed = fuzz_location(coords, &mut rand::thread_rng());
        let location = UserLocation {
            latitude,
            longitude,
            geohash: geohash_encode(coords, geohash::DEFAULT_PRECISION),
            display_latitude: fuzzed.latitude,
            display_longitude: fuzzed.longitude,
            approximate_address: full_address
                .map(approximate_address)
                .filter(|reduced| !reduced.is_empty()),
        };

        let user = self.users.set_location(user_id, &location).await?;
        info!(user = %user.public_id, geohash = %location.geohash, "updated user location");
        Ok(user)
    }
}
