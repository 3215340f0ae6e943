//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use rand::{distributions::Alphanumeric, Rng};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use gardenswap_auth::{AuthUser, Authenticator};
use gardenswap_catalog::{DiscoveryService, ProductEventBus, ProductService};
use gardenswap_config::{AppConfig, DiscoveryConfig};
use gardenswap_exchanges::{ChatService, ExchangeService};
use gardenswap_users::{
    AccountMergeService, AccountService, NotificationService, ProfileService,
};

use crate::error::ApiError;

const OAUTH_STATE_TTL: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub authenticator: Authenticator,
    pub profiles: ProfileService,
    pub accounts: AccountService,
    pub merges: AccountMergeService,
    pub notifications: NotificationService,
    pub products: ProductService,
    pub discovery: DiscoveryService,
    pub exchanges: ExchangeService,
    pub chats: ChatService,
    pub bus: ProductEventBus,
    pub discovery_defaults: DiscoveryConfig,
    pub oauth_state: OAuthStateStore,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &AppConfig) -> Self {
        let bus = ProductEventBus::default();

        Self {
            inner: Arc::new(AppStateInner {
                authenticator: Authenticator::new(pool.clone(), config.auth.clone()),
                profiles: ProfileService::new(pool.clone()),
                accounts: AccountService::new(pool.clone()),
                merges: AccountMergeService::new(pool.clone()),
                notifications: NotificationService::new(pool.clone()),
                products: ProductService::new(pool.clone(), bus.clone()),
                discovery: DiscoveryService::new(pool.clone()),
                exchanges: ExchangeService::new(pool.clone()),
                chats: ChatService::new(pool),
                bus,
                discovery_defaults: config.discovery.clone(),
                oauth_state: OAuthStateStore::new(OAUTH_STATE_TTL),
            }),
        }
    }

    /// Resolve the bearer token in `headers` to a user.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
        let token = require_bearer(headers)?;
        let (user, _session) = self
            .authenticator
            .authenticate_token(&token)
            .await
            .map_err(ApiError::from)?;
        Ok(user)
    }
}

impl std::ops::Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// One-time OAuth state tokens with a TTL.
pub struct OAuthStateStore {
    entries: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl OAuthStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn issue(&self) -> String {
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        let mut guard = self.entries.lock().await;
        Self::prune(&mut guard, self.ttl);
        guard.insert(state.clone(), Instant::now());
        state
    }

    pub async fn consume(&self, state: &str) -> bool {
        let mut guard = self.entries.lock().await;
        Self::prune(&mut guard, self.ttl);
        guard.remove(state).is_some()
    }

    fn prune(entries: &mut HashMap<String, Instant>, ttl: Duration) {
        let now = Instant::now();
        entries.retain(|_, created| now.duration_since(*created) <= ttl);
    }
}

pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(ApiError::unauthorized("invalid authorization scheme"));
    }

    let token = parts.next().unwrap_or("");
    if token.is_empty() {
        return Err(ApiError::unauthorized("missing bearer token"));
    }

    Ok(token.to_string())
}
