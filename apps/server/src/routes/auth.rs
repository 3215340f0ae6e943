//! Authentication endpoints: password accounts, Google OAuth with deferred
//! account merge, and the current-user lookup.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use gardenswap_auth::AuthSession;

use crate::error::ApiError;
use crate::routes::profile::ProfileResponse;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/google/login", get(google_login))
        .route("/api/auth/google/callback", post(google_callback))
        .route("/api/me", get(me))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    token: String,
    expires_at: String,
    user: ProfileResponse,
}

#[derive(Debug, Serialize)]
struct GoogleLoginResponse {
    authorize_url: String,
}

#[derive(Debug, Deserialize)]
struct GoogleLoginQuery {
    redirect_uri: String,
}

#[derive(Debug, Deserialize)]
struct GoogleCallbackRequest {
    code: String,
    state: String,
    redirect_uri: String,
}

async fn session_response(
    state: &AppState,
    session: AuthSession,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = state.profiles.profile(session.user_id).await?;
    Ok(Json(SessionResponse {
        token: session.token,
        expires_at: session.expires_at.to_rfc3339(),
        user: ProfileResponse::own(user),
    }))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("invalid email address"));
    }
    if payload.password.len() < 10 {
        return Err(ApiError::bad_request("password must be at least 10 characters"));
    }

    state
        .authenticator
        .register_with_password(email, &payload.password, payload.display_name.as_deref())
        .await?;

    let session = state
        .authenticator
        .login_with_password(email, &payload.password)
        .await?;

    session_response(&state, session).await
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .authenticator
        .login_with_password(payload.email.trim(), &payload.password)
        .await?;

    session_response(&state, session).await
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<(), ApiError> {
    let token = crate::state::require_bearer(&headers)?;
    state.authenticator.logout(&token).await?;
    Ok(())
}

async fn google_login(
    State(state): State<AppState>,
    Query(params): Query<GoogleLoginQuery>,
) -> Result<Json<GoogleLoginResponse>, ApiError> {
    let oauth_state = state.oauth_state.issue().await;
    let authorize_url = match state
        .authenticator
        .google_authorization_url(&oauth_state, &params.redirect_uri)
    {
        Ok(url) => url,
        Err(err) => {
            state.oauth_state.consume(&oauth_state).await;
            return Err(ApiError::from(err));
        }
    };

    Ok(Json(GoogleLoginResponse { authorize_url }))
}

/// Finish a Google sign-in. When the email collided with a password account,
/// the deferred merge runs here, right after the sign-in completed.
async fn google_callback(
    State(state): State<AppState>,
    Json(payload): Json<GoogleCallbackRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if !state.oauth_state.consume(&payload.state).await {
        return Err(ApiError::bad_request("invalid or expired OAuth state"));
    }

    let sign_in = state
        .authenticator
        .login_with_google_code(&payload.code, &payload.redirect_uri)
        .await?;

    // Run the deferred merge for this account if one is pending — either
    // recorded by this very sign-in or left over from an earlier attempt
    // that failed mid-way.
    let report = state.merges.complete_for(sign_in.session.user_id).await?;
    if let Some(report) = report {
        info!(
            old_user = report.old_user_id,
            new_user = report.new_user_id,
            "merged colliding accounts after google sign-in"
        );
    }

    session_response(&state, sign_in.session).await
}

async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let profile = state.profiles.profile(user.id).await?;
    Ok(Json(ProfileResponse::own(profile)))
}
