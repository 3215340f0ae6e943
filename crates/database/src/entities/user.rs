use serde::{Deserialize, Serialize};

use crate::types::now_rfc3339;

/// Points required to advance one level.
const POINTS_PER_LEVEL: i64 = 100;

/// A marketplace user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Database primary key
    pub id: i64,
    /// Publicly accessible identifier
    pub public_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    /// Geolocated address, when the user has shared one
    pub location: Option<UserLocation>,
    /// Aggregate of received exchange reviews
    pub reputation: Reputation,
    /// Activity points driving the level
    pub points: i64,
    pub level: i64,
    /// Earned badge tags
    pub badges: Vec<String>,
    /// Whether the user finished onboarding
    pub onboarded: bool,
    pub preferences: UserPreferences,
    pub status: UserStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Stored location detail for a user.
///
/// `latitude`/`longitude` are exact and never published directly; the
/// `display_*` pair is the privacy-fuzzed variant shown to other users, and
/// `approximate_address` is the reduced textual form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub geohash: String,
    pub display_latitude: f64,
    pub display_longitude: f64,
    pub approximate_address: Option<String>,
}

/// Running average of received review ratings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reputation {
    pub average: f64,
    pub review_count: i64,
}

impl Reputation {
    /// Fold one more rating into the aggregate.
    pub fn apply_rating(&self, rating: u8) -> Reputation {
        let count = self.review_count + 1;
        let average = (self.average * self.review_count as f64 + f64::from(rating)) / count as f64;
        Reputation {
            average,
            review_count: count,
        }
    }
}

/// Notification and privacy preferences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub notify_exchanges: bool,
    pub notify_messages: bool,
    pub share_exact_location: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            notify_exchanges: true,
            notify_messages: true,
            share_exact_location: false,
        }
    }
}

/// User lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Deleted,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Deleted => "deleted",
        }
    }
}

impl From<&str> for UserStatus {
    fn from(s: &str) -> Self {
        match s {
            "deleted" => UserStatus::Deleted,
            _ => UserStatus::Active,
        }
    }
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub onboarded: Option<bool>,
    pub notify_exchanges: Option<bool>,
    pub notify_messages: Option<bool>,
    pub share_exact_location: Option<bool>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref display_name) = self.display_name {
            if display_name.trim().is_empty() {
                return Err("display name cannot be empty".to_string());
            }
            if display_name.len() > 100 {
                return Err("display name too long (max 100 characters)".to_string());
            }
        }

        if let Some(ref bio) = self.bio {
            if bio.len() > 1000 {
                return Err("bio too long (max 1000 characters)".to_string());
            }
        }

        if let Some(ref avatar_url) = self.avatar_url {
            if !avatar_url.starts_with("http://") && !avatar_url.starts_with("https://") {
                return Err("avatar URL must be a valid HTTP/HTTPS URL".to_string());
            }
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.avatar_url.is_none()
            && self.bio.is_none()
            && self.onboarded.is_none()
            && self.notify_exchanges.is_none()
            && self.notify_messages.is_none()
            && self.share_exact_location.is_none()
    }
}

/// Level implied by an amount of activity points.
pub fn level_for_points(points: i64) -> i64 {
    points / POINTS_PER_LEVEL + 1
}

impl User {
    /// Display name with fallbacks for profiles that never set one.
    pub fn display_name_or_fallback(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| "Anonymous gardener".to_string())
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, UserStatus::Active)
    }

    /// Coordinates other users are allowed to see.
    pub fn visible_coordinates(&self) -> Option<(f64, f64)> {
        let location = self.location.as_ref()?;
        if self.preferences.share_exact_location {
            Some((location.latitude, location.longitude))
        } else {
            Some((location.display_latitude, location.display_longitude))
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now_rfc3339();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = now_rfc3339();
        User {
            id: 1,
            public_id: "u1".to_string(),
            email: Some("ana@example.com".to_string()),
            display_name: Some("Ana".to_string()),
            avatar_url: None,
            bio: None,
            location: None,
            reputation: Reputation::default(),
            points: 0,
            level: 1,
            badges: Vec::new(),
            onboarded: false,
            preferences: UserPreferences::default(),
            status: UserStatus::Active,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn reputation_running_average() {
        let rep = Reputation::default();
        let rep = rep.apply_rating(5);
        assert_eq!(rep.review_count, 1);
        assert_eq!(rep.average, 5.0);

        let rep = rep.apply_rating(2);
        assert_eq!(rep.review_count, 2);
        assert!((rep.average - 3.5).abs() < 1e-9);
    }

    #[test]
    fn levels_step_every_hundred_points() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(99), 1);
        assert_eq!(level_for_points(100), 2);
        assert_eq!(level_for_points(350), 4);
    }

    #[test]
    fn display_name_fallback_chain() {
        let mut user = sample_user();
        assert_eq!(user.display_name_or_fallback(), "Ana");

        user.display_name = None;
        assert_eq!(user.display_name_or_fallback(), "ana@example.com");

        user.email = None;
        assert_eq!(user.display_name_or_fallback(), "Anonymous gardener");
    }

    #[test]
    fn visible_coordinates_respect_privacy_preference() {
        let mut user = sample_user();
        user.location = Some(UserLocation {
            latitude: 40.0,
            longitude: -3.0,
            geohash: "ezjmgtwyz".to_string(),
            display_latitude: 40.005,
            display_longitude: -3.004,
            approximate_address: Some("Madrid, Spain".to_string()),
        });

        assert_eq!(user.visible_coordinates(), Some((40.005, -3.004)));

        user.preferences.share_exact_location = true;
        assert_eq!(user.visible_coordinates(), Some((40.0, -3.0)));
    }

    #[test]
    fn update_request_validation() {
        let ok = UpdateProfileRequest {
            display_name: Some("Bea".to_string()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let empty_name = UpdateProfileRequest {
            display_name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(empty_name.validate().is_err());

        let bad_avatar = UpdateProfileRequest {
            avatar_url: Some("ftp://nope".to_string()),
            ..Default::default()
        };
        assert!(bad_avatar.validate().is_err());
    }
}
