use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RepoError, Result};
use crate::query::QueryConfig;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/mealctl";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Load environment variables from .env files
///
/// Priority order (highest to lowest):
/// 1. Environment variables already set
/// 2. Current directory .env
/// 3. ~/.mealctl/.env
///
/// dotenvy never overwrites a variable that is already set, so earlier
/// files win.
pub fn load_dotenv() {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded .env from current directory: {}", path.display());
        loaded_from.push(path);
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            match dotenvy::from_path(&env_file) {
                Ok(()) => {
                    debug!("Loaded .env from {}", env_file.display());
                    loaded_from.push(env_file);
                }
                Err(e) => debug!("Failed to load {}: {}", env_file.display(), e),
            }
        }
    }

    if loaded_from.is_empty() {
        debug!("No .env files found (current dir or ~/.mealctl)");
    }
}

/// The mealctl config directory (~/.mealctl)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".mealctl"))
}

/// ~/.mealctl/config.toml
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealctlConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl MealctlConfig {
    /// Built-in defaults, then ~/.mealctl/config.toml, then the environment.
    ///
    /// A config file that fails to parse is reported and skipped.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(path) = default_config_path().filter(|p| p.exists()) {
            match Self::from_file(&path) {
                Ok(file_config) => {
                    debug!("Loaded config from {}", path.display());
                    config = file_config;
                }
                Err(e) => warn!("Ignoring {}: {}", path.display(), e),
            }
        }

        if let Err(e) = config.apply_env(|name| std::env::var(name).ok()) {
            warn!("Ignoring environment override: {}", e);
        }
        config
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RepoError::config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| RepoError::config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DATABASE_URL` and `MEALCTL_MAX_CONNECTIONS`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("DATABASE_URL").filter(|u| !u.is_empty()) {
            info!("Using DATABASE_URL from environment");
            self.database.url = url;
        }

        if let Some(raw) = var("MEALCTL_MAX_CONNECTIONS") {
            self.database.max_connections = raw.trim().parse().map_err(|_| {
                RepoError::config(format!("MEALCTL_MAX_CONNECTIONS must be a positive integer, got '{}'", raw))
            })?;
        }

        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(RepoError::config("database.max_connections must be at least 1"));
        }
        if self.query.max_limit == 0 {
            return Err(RepoError::config("query.max_limit must be at least 1"));
        }
        Ok(())
    }
}
