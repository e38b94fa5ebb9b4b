//! Service configuration.
//!
//! Read from `$PUSHER_CONFIG` or `./pusher.toml`. A missing file yields the
//! defaults. Secrets may be supplied through the environment instead of the
//! file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pusher_auth::AuthSecrets;
use pusher_cache::CachePolicy;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PUSHER_CONFIG";
pub const SAVE_SECRET_ENV: &str = "PUSHER_SAVE_SECRET";
pub const LOAD_SECRET_ENV: &str = "PUSHER_LOAD_SECRET";
pub const BYPASS_TOKEN_ENV: &str = "PUSHER_BYPASS_TOKEN";

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file. Empty = in-memory.
    #[serde(default)]
    pub path: String,
}

/// Signing secrets.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Master secret for per-user upload keys.
    #[serde(default)]
    pub save_secret: String,
    /// Secret for read signatures and load responses.
    #[serde(default)]
    pub load_secret: String,
    /// Operator bypass token. Empty disables it.
    #[serde(default)]
    pub bypass_token: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("save_secret", &"<redacted>")
            .field("load_secret", &"<redacted>")
            .field("bypass_enabled", &!self.bypass_token.is_empty())
            .finish()
    }
}

/// Timing for one cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Served without reloading while younger than this.
    pub fresh_secs: u64,
    /// Never served once older than this.
    pub ttl_secs: u64,
    /// Maximum distinct keys. None = unbounded.
    pub capacity: Option<usize>,
}

impl CacheSettings {
    const fn new(fresh_secs: u64, ttl_secs: u64, capacity: Option<usize>) -> Self {
        Self {
            fresh_secs,
            ttl_secs,
            capacity,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        let policy = CachePolicy::new(
            Duration::from_secs(self.fresh_secs),
            Duration::from_secs(self.ttl_secs),
        );
        match self.capacity {
            Some(capacity) => policy.with_capacity(capacity),
            None => policy,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::new(60, 120, None)
    }
}

/// Per-query cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub rankings: CacheSettings,
    pub total_medals: CacheSettings,
    pub statistics: CacheSettings,
    pub achievement_rates: CacheSettings,
    pub medal_timeseries: CacheSettings,
    pub save_activity: CacheSettings,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            rankings: CacheSettings::new(60, 120, Some(500)),
            total_medals: CacheSettings::new(60, 120, None),
            statistics: CacheSettings::new(300, 600, None),
            achievement_rates: CacheSettings::new(3600, 7200, None),
            medal_timeseries: CacheSettings::new(3600, 7200, Some(32)),
            save_activity: CacheSettings::new(600, 1200, Some(32)),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: ServerConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Override secrets with any non-empty value `lookup` returns.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets = [
            (SAVE_SECRET_ENV, &mut self.auth.save_secret),
            (LOAD_SECRET_ENV, &mut self.auth.load_secret),
            (BYPASS_TOKEN_ENV, &mut self.auth.bypass_token),
        ];
        for (name, slot) in targets {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                *slot = value;
            }
        }
    }

    /// SQLite path, or None for an in-memory store.
    pub fn database_path(&self) -> Option<PathBuf> {
        if self.database.path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.database.path))
        }
    }

    pub fn secrets(&self) -> AuthSecrets {
        AuthSecrets {
            save_secret: self.auth.save_secret.as_bytes().to_vec(),
            load_secret: self.auth.load_secret.as_bytes().to_vec(),
            bypass_token: self.auth.bypass_token.clone(),
        }
    }

    fn config_path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("pusher.toml"))
    }
}
