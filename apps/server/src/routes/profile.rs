//! Profile, location, and account endpoints.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{delete, get, patch, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use gardenswap_database::{Reputation, UpdateProfileRequest, User};

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/profile", patch(update_profile))
        .route("/api/profile/location", put(set_location))
        .route("/api/users/:id", get(public_profile))
        .route("/api/account", delete(delete_account))
}

/// Profile as returned by the API. The `own` view carries the exact
/// location; the public view only ever exposes the fuzzed coordinates and
/// the approximate address.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub reputation: Reputation,
    pub points: i64,
    pub level: i64,
    pub badges: Vec<String>,
    pub onboarded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approximate_address: Option<String>,
}

impl ProfileResponse {
    /// The signed-in user's own view: exact coordinates included.
    pub fn own(user: User) -> Self {
        let (latitude, longitude) = match user.location.as_ref() {
            Some(location) => (Some(location.latitude), Some(location.longitude)),
            None => (None, None),
        };
        Self::build(user, latitude, longitude)
    }

    /// What other users see: privacy-respecting coordinates only.
    pub fn public_view(user: User) -> Self {
        let coords = user.visible_coordinates();
        let (latitude, longitude) = match coords {
            Some((latitude, longitude)) => (Some(latitude), Some(longitude)),
            None => (None, None),
        };
        let mut response = Self::build(user, latitude, longitude);
        response.email = None;
        response
    }

    fn build(user: User, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        Self {
            id: user.public_id.clone(),
            email: user.email.clone(),
            display_name: user.display_name_or_fallback(),
            avatar_url: user.avatar_url.clone(),
            bio: user.bio.clone(),
            reputation: user.reputation,
            points: user.points,
            level: user.level,
            badges: user.badges.clone(),
            onboarded: user.onboarded,
            approximate_address: user
                .location
                .as_ref()
                .and_then(|location| location.approximate_address.clone()),
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SetLocationRequest {
    latitude: f64,
    longitude: f64,
    address: Option<String>,
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let updated = state.profiles.update_profile(user.id, payload).await?;
    Ok(Json(ProfileResponse::own(updated)))
}

async fn set_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SetLocationRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let updated = state
        .profiles
        .set_location(
            user.id,
            payload.latitude,
            payload.longitude,
            payload.address.as_deref(),
        )
        .await?;
    Ok(Json(ProfileResponse::own(updated)))
}

async fn public_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    state.authenticate(&headers).await?;
    let profile = state.profiles.profile_by_public_id(&public_id).await?;
    Ok(Json(ProfileResponse::public_view(profile)))
}

async fn delete_account(State(state): State<AppState>, headers: HeaderMap) -> Result<(), ApiError> {
    let user = state.authenticate(&headers).await?;
    state.accounts.delete_account(user.id).await?;
    Ok(())
}
