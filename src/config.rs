use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::services::bootstrap::SuperadminSeed;
use crate::services::password::PasswordScheme;

const CONFIG_HEADER: &str = "\
# ValidS configuration
#
# [security] password_scheme:
#   \"argon2id\" (default) writes salted PHC strings.
#   \"sha256\" writes unsalted hex digests, the format other tools writing to the
#   same users collection compare against. Pick it when sharing the store with them;
#   otherwise the collection ends up with mixed digest formats.
";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub database: DatabaseConfig,

    pub bootstrap: BootstrapConfig,

    pub security: SecurityConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Either "pretty" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `mongodb://` / `mongodb+srv://` selects MongoDB, `sqlite:` selects the SQL store.
    pub url: String,

    /// Database name inside the MongoDB deployment. Ignored for SQLite.
    pub name: String,

    /// How long to wait for the store before giving up.
    pub connect_timeout_seconds: u64,

    pub max_connections: u32,

    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            name: "valids_db".to_string(),
            connect_timeout_seconds: 10,
            max_connections: 5,
            min_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Run the superadmin bootstrap when `serve` starts.
    pub on_startup: bool,

    pub username: String,

    pub email: String,

    /// Seed password. When unset the built-in first-run password is used,
    /// unless `require_explicit_password` is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Refuse to fall back to the built-in password.
    pub require_explicit_password: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            on_startup: true,
            username: "superadmin".to_string(),
            email: "admin@valids.com".to_string(),
            password: None,
            require_explicit_password: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Digest format for newly written passwords.
    /// `sha256` matches what the legacy HTTP API compares against.
    pub password_scheme: PasswordScheme,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            password_scheme: PasswordScheme::Argon2id,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub api_prefix: String,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
            api_prefix: "/api/v1".to_string(),
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            database: DatabaseConfig::default(),
            bootstrap: BootstrapConfig::default(),
            security: SecurityConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Loads `.env`, the first config file found, then environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        if let Ok(explicit) = std::env::var("VALIDS_CONFIG") {
            return Self::load_from_path(Path::new(&explicit));
        }

        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment names follow the variables the compose files already export.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MONGODB_URL") {
            self.database.url = url;
        }
        if let Some(name) = lookup("DATABASE_NAME") {
            self.database.name = name;
        }
        if let Some(level) = lookup("VALIDS_LOG_LEVEL") {
            self.general.log_level = level;
        }
        if let Some(username) = lookup("VALIDS_SUPERADMIN_USERNAME") {
            self.bootstrap.username = username;
        }
        if let Some(email) = lookup("VALIDS_SUPERADMIN_EMAIL") {
            self.bootstrap.email = email;
        }
        if let Some(password) = lookup("VALIDS_SUPERADMIN_PASSWORD").filter(|p| !p.is_empty()) {
            self.bootstrap.password = Some(password);
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = format!("{CONFIG_HEADER}\n{}", toml::to_string_pretty(self)?);
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("valids").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".valids").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Copy safe to print: credentials are masked.
    #[must_use]
    pub fn masked(&self) -> Self {
        let mut config = self.clone();
        config.database.url = crate::db::mongo::redact(&config.database.url);
        if config.bootstrap.password.as_deref().is_some_and(|p| !p.is_empty()) {
            config.bootstrap.password = Some("********".to_string());
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url cannot be empty");
        }

        if self.database.connect_timeout_seconds == 0 {
            anyhow::bail!("database.connect_timeout_seconds must be > 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!("database.min_connections cannot exceed database.max_connections");
        }

        SuperadminSeed::from_config(&self.bootstrap)
            .validate()
            .context("Invalid [bootstrap] section")?;

        if !matches!(self.general.log_format.as_str(), "pretty" | "json") {
            anyhow::bail!(
                "general.log_format must be \"pretty\" or \"json\", got \"{}\"",
                self.general.log_format
            );
        }

        Ok(())
    }
}
