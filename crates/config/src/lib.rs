use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "gardenswap.toml",
    "config/gardenswap.toml",
    "crates/config/gardenswap.toml",
    "../gardenswap.toml",
    "../config/gardenswap.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://gardenswap.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_session_ttl")]
    pub session_ttl_seconds: u64,
    #[serde(default)]
    pub google: GoogleAuthConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: Self::default_session_ttl(),
            google: GoogleAuthConfig::default(),
        }
    }
}

impl AuthConfig {
    fn default_session_ttl() -> u64 {
        86_400
    }
}

/// OAuth credentials for the Google sign-in provider. Social sign-in is
/// disabled when either field is missing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GoogleAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Defaults for the product discovery feed.
///
/// `max_distance_km` is the radius applied when a search does not name one.
/// The value 100 doubles as the "unbounded" sentinel understood by the
/// catalog crate, so the out-of-the-box behavior is an unfiltered feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "DiscoveryConfig::default_max_distance")]
    pub max_distance_km: f64,
    #[serde(default = "DiscoveryConfig::default_page_size")]
    pub page_size: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_distance_km: Self::default_max_distance(),
            page_size: Self::default_page_size(),
        }
    }
}

impl DiscoveryConfig {
    fn default_max_distance() -> f64 {
        100.0
    }

    const fn default_page_size() -> u32 {
        50
    }
}

/// Load the application configuration by combining defaults, an optional
/// configuration file, and `GARDENSWAP__`-prefixed environment overrides.
///
/// ```
/// std::env::remove_var("GARDENSWAP_CONFIG");
///
/// let config = gardenswap_config::load().expect("defaults should load");
/// assert!(!config.http.address.is_empty());
/// assert_eq!(config.discovery.max_distance_km, 100.0);
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let mut builder = config::Config::builder();

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("GARDENSWAP_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via GARDENSWAP_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(config::Environment::with_prefix("GARDENSWAP").separator("__"));

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded configuration");
    Ok(config)
}
