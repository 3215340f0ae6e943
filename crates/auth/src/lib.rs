//! Identity management: password and Google sign-in, bearer sessions, and
//! detection of email collisions between the two.
//!
//! When a Google sign-in arrives for an email that already belongs to a
//! password account, the sign-in completes against a fresh user record and a
//! deferred-merge marker is written; the users crate later folds the old
//! account into the new one.

use anyhow::Context;
use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use cuid2::CuidConstructor;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use once_cell::sync::Lazy;
use rand::RngCore;
use serde::Deserialize;
use sqlx::{Row, SqlitePool, Transaction};
use thiserror::Error;
use tracing::{debug, info, warn};

use gardenswap_config::{AuthConfig, GoogleAuthConfig};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    session_ttl: Duration,
    google: Option<GoogleOAuth>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user already exists")]
    UserExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("google oauth is not configured")]
    GoogleOauthDisabled,
    #[error("google oauth error: {0}")]
    GoogleOauth(#[from] anyhow::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
}

/// The identity slice of a user row, as far as authentication cares.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub public_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// Profile returned by the Google userinfo endpoint.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    /// Stable OpenID Connect subject
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Deferred-merge marker: the Google sign-in for `email` collided with the
/// password account `old_user_id` and completed as `new_user_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMerge {
    pub id: i64,
    pub email: String,
    pub old_user_id: i64,
    pub new_user_id: i64,
}

/// Outcome of a social sign-in.
#[derive(Debug)]
pub struct SocialSignIn {
    pub session: AuthSession,
    /// Present when the sign-in collided with a password account and an
    /// account merge still has to run.
    pub pending_merge: Option<PendingMerge>,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: AuthConfig) -> Self {
        let session_ttl = Duration::seconds(config.session_ttl_seconds.min(i64::MAX as u64) as i64);
        let google = GoogleOAuth::from_config(&config.google);

        Self {
            pool,
            session_ttl,
            google,
        }
    }

    pub fn google_enabled(&self) -> bool {
        self.google.is_some()
    }

    pub fn google_authorization_url(
        &self,
        state: &str,
        redirect_uri: &str,
    ) -> Result<String, AuthError> {
        let google = self.google.as_ref().ok_or(AuthError::GoogleOauthDisabled)?;
        google
            .authorize_url(state, redirect_uri)
            .map_err(AuthError::GoogleOauth)
    }

    pub async fn register_with_password(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthUser, AuthError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_some() {
            return Err(AuthError::UserExists);
        }

        let password_hash = self.hash_password(password)?;
        let user = self
            .insert_user(&mut tx, Some(email.to_owned()), display_name.map(str::to_owned))
            .await?;

        self.insert_identity(&mut tx, user.id, "password", email, Some(&password_hash))
            .await?;

        tx.commit().await?;

        info!(user = %user.public_id, "registered password account");
        Ok(user)
    }

    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let identity = sqlx::query(
            "SELECT user_id, secret FROM user_identities \
             WHERE provider = 'password' AND provider_uid = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = identity else {
            return Err(AuthError::InvalidCredentials);
        };

        let secret: Option<String> = row.try_get("secret")?;
        let secret = secret.ok_or(AuthError::InvalidCredentials)?;
        let stored_hash = PasswordHash::new(&secret)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &stored_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let user_id: i64 = row.try_get("user_id")?;
        self.issue_session(user_id).await
    }

    /// Providers already registered for an email, e.g. `["password"]`.
    pub async fn sign_in_methods(&self, email: &str) -> Result<Vec<String>, AuthError> {
        let rows = sqlx::query(
            "SELECT ui.provider FROM user_identities ui \
             JOIN users u ON u.id = ui.user_id WHERE u.email = ? ORDER BY ui.provider",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("provider").map_err(AuthError::from))
            .collect()
    }

    pub async fn login_with_google_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<SocialSignIn, AuthError> {
        let google = self.google.as_ref().ok_or(AuthError::GoogleOauthDisabled)?;

        let profile = google
            .exchange_code(code, redirect_uri)
            .await
            .map_err(AuthError::GoogleOauth)?;

        self.login_with_google_profile(profile).await
    }

    /// Complete a Google sign-in for an already-fetched profile.
    ///
    /// Collision path: the profile email belongs to a user who signs in with
    /// a password. The sign-in then completes against a brand-new user record
    /// and a pending-merge marker is written for the deferred merge.
    pub async fn login_with_google_profile(
        &self,
        profile: GoogleProfile,
    ) -> Result<SocialSignIn, AuthError> {
        let mut tx = self.pool.begin().await?;

        if let Some(row) = sqlx::query(
            "SELECT user_id FROM user_identities WHERE provider = 'google' AND provider_uid = ?",
        )
        .bind(&profile.subject)
        .fetch_optional(&mut *tx)
        .await?
        {
            let user_id: i64 = row.try_get("user_id")?;
            tx.commit().await?;
            let session = self.issue_session(user_id).await?;
            return Ok(SocialSignIn {
                session,
                pending_merge: None,
            });
        }

        let mut pending_merge = None;

        let user = match profile.email.as_ref() {
            Some(email) => {
                let existing = sqlx::query("SELECT id FROM users WHERE email = ?")
                    .bind(email)
                    .fetch_optional(&mut *tx)
                    .await?;

                match existing {
                    Some(row) => {
                        let existing_id: i64 = row.try_get("id")?;
                        let has_password = sqlx::query(
                            "SELECT 1 FROM user_identities \
                             WHERE user_id = ? AND provider = 'password'",
                        )
                        .bind(existing_id)
                        .fetch_optional(&mut *tx)
                        .await?
                        .is_some();

                        if has_password {
                            // Collision confirmed. The email stays on the old
                            // row until the merge moves it over.
                            let user = self
                                .insert_user(&mut tx, None, profile.name.clone())
                                .await?;
                            let marker = self
                                .insert_pending_merge(&mut tx, email, existing_id, user.id)
                                .await?;
                            warn!(
                                email = %email,
                                old_user = existing_id,
                                new_user = user.id,
                                "google sign-in collided with password account, merge deferred"
                            );
                            pending_merge = Some(marker);
                            user
                        } else {
                            self.fetch_user_tx(&mut tx, existing_id).await?
                        }
                    }
                    None => {
                        self.insert_user(&mut tx, Some(email.clone()), profile.name.clone())
                            .await?
                    }
                }
            }
            None => self.insert_user(&mut tx, None, profile.name.clone()).await?,
        };

        self.insert_identity(&mut tx, user.id, "google", &profile.subject, None)
            .await?;

        tx.commit().await?;

        info!(user = %user.public_id, "linked google identity");
        let session = self.issue_session(user.id).await?;
        Ok(SocialSignIn {
            session,
            pending_merge,
        })
    }

    pub async fn authenticate_token(&self, token: &str) -> Result<(AuthUser, AuthSession), AuthError> {
        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::SessionNotFound);
        };

        let user_id: i64 = row.try_get("user_id")?;
        let expires_at: String = row.try_get("expires_at")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| AuthError::InvalidSession)?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Err(AuthError::SessionExpired);
        }

        let user = self.fetch_user(user_id).await?;
        let session = AuthSession {
            token: token.to_owned(),
            user_id,
            expires_at,
        };

        Ok((user, session))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_user(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        email: Option<String>,
        display_name: Option<String>,
    ) -> Result<AuthUser, AuthError> {
        let now = Utc::now().to_rfc3339();
        let public_id = new_public_id();

        let result = sqlx::query(
            "INSERT INTO users (public_id, email, display_name, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(email.as_deref())
        .bind(display_name.as_deref())
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;

        Ok(AuthUser {
            id: result.last_insert_rowid(),
            public_id,
            email,
            display_name,
        })
    }

    async fn insert_identity(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        user_id: i64,
        provider: &str,
        provider_uid: &str,
        secret: Option<&str>,
    ) -> Result<(), AuthError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO user_identities (user_id, provider, provider_uid, secret, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(provider)
        .bind(provider_uid)
        .bind(secret)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_pending_merge(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        email: &str,
        old_user_id: i64,
        new_user_id: i64,
    ) -> Result<PendingMerge, AuthError> {
        let result = sqlx::query(
            "INSERT INTO pending_merges (email, old_user_id, new_user_id, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(email)
        .bind(old_user_id)
        .bind(new_user_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut **tx)
        .await?;

        Ok(PendingMerge {
            id: result.last_insert_rowid(),
            email: email.to_owned(),
            old_user_id,
            new_user_id,
        })
    }

    async fn fetch_user(&self, id: i64) -> Result<AuthUser, AuthError> {
        let row = sqlx::query("SELECT public_id, email, display_name FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(AuthUser {
            id,
            public_id: row.try_get("public_id")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
        })
    }

    async fn fetch_user_tx(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        id: i64,
    ) -> Result<AuthUser, AuthError> {
        let row = sqlx::query("SELECT public_id, email, display_name FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&mut **tx)
            .await?;

        Ok(AuthUser {
            id,
            public_id: row.try_get("public_id")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
        })
    }

    async fn issue_session(&self, user_id: i64) -> Result<AuthSession, AuthError> {
        let token = generate_session_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        sqlx::query(
            "INSERT INTO sessions (user_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&token)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(AuthSession {
            token,
            user_id,
            expires_at,
        })
    }

    fn hash_password(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn new_public_id() -> String {
    CUID.create_id()
}

#[derive(Clone)]
struct GoogleOAuth {
    client: BasicClient,
    http: reqwest::Client,
}

impl GoogleOAuth {
    fn from_config(config: &GoogleAuthConfig) -> Option<Self> {
        let client_id = config.client_id.clone()?;
        let client_secret = config.client_secret.clone()?;
        Some(Self::new(client_id, client_secret))
    }

    fn new(client_id: String, client_secret: String) -> Self {
        let client = BasicClient::new(
            ClientId::new(client_id),
            Some(ClientSecret::new(client_secret)),
            AuthUrl::new(GOOGLE_AUTH_URL.to_string()).expect("invalid google auth url"),
            Some(TokenUrl::new(GOOGLE_TOKEN_URL.to_string()).expect("invalid google token url")),
        )
        .set_auth_type(oauth2::AuthType::RequestBody);

        let http = reqwest::Client::builder()
            .user_agent("gardenswap-backend")
            .build()
            .expect("failed to build google http client");

        Self { client, http }
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> anyhow::Result<String> {
        let redirect = RedirectUrl::new(redirect_uri.to_owned())
            .context("invalid redirect uri for google oauth")?;

        let (url, _) = self
            .client
            .clone()
            .set_redirect_uri(redirect)
            .authorize_url(|| CsrfToken::new(state.to_owned()))
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .url();

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> anyhow::Result<GoogleProfile> {
        let redirect = RedirectUrl::new(redirect_uri.to_owned())
            .context("invalid redirect uri for google oauth")?;

        let token_response = self
            .client
            .clone()
            .set_redirect_uri(redirect)
            .exchange_code(AuthorizationCode::new(code.to_owned()))
            .request_async(async_http_client)
            .await
            .context("failed to exchange google oauth code")?;

        let access_token = token_response.access_token().secret();

        let user: GoogleUserinfoResponse = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .context("failed to call google userinfo endpoint")?
            .error_for_status()
            .context("google userinfo endpoint returned error")?
            .json()
            .await
            .context("failed to decode google userinfo response")?;

        debug!(subject = %user.sub, "fetched google user profile");

        Ok(GoogleProfile {
            subject: user.sub,
            email: user.email,
            name: user.name,
        })
    }
}

#[derive(Deserialize)]
struct GoogleUserinfoResponse {
    sub: String,
    name: Option<String>,
    email: Option<String>,
}
