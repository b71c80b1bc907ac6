//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote scheme API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Concurrency, retry and pacing behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Recency filter settings
    #[serde(default)]
    pub filter: FilterConfig,

    /// Database sink settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Backup file and progress reporting
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Config load failed from {:?}: {}. Using defaults.", path, e);
                Self::default()
            }
        }
    }

    /// Validate configuration values for basic sanity.
    ///
    /// Runs before any network call, so a failure here aborts the update
    /// without touching the API or either sink.
    pub fn validate(&self) -> Result<()> {
        self.api.base_url()?;
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.fetch.concurrency == 0 {
            return Err(AppError::validation("fetch.concurrency must be > 0"));
        }
        if self.fetch.retry_count == 0 {
            return Err(AppError::validation("fetch.retry_count must be > 0"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.output.backup_file.trim().is_empty() {
            return Err(AppError::validation("output.backup_file is empty"));
        }
        if self.output.progress_every == 0 {
            return Err(AppError::validation("output.progress_every must be > 0"));
        }
        self.database.validate()
    }
}

/// Remote scheme API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Master list endpoint; per-scheme detail lives at `{base_url}/{code}`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl ApiConfig {
    /// Parse the configured base URL.
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(self.base_url.trim_end_matches('/'))?;
        if url.cannot_be_a_base() {
            return Err(AppError::validation(format!(
                "api.base_url '{}' cannot be used as a base",
                self.base_url
            )));
        }
        Ok(url)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// How master-list entries without a scheme code are accounted for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingIdPolicy {
    /// Count the entry in `total` and classify it as rejected.
    #[default]
    Count,
    /// Drop the entry before dispatch; it never appears in `total`.
    Exclude,
}

/// Concurrency, retry and pacing behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum number of scheme fetches in flight
    #[serde(default = "defaults::concurrency")]
    pub concurrency: usize,

    /// Attempts per scheme before it is reported as failed
    #[serde(default = "defaults::retry_count")]
    pub retry_count: u32,

    /// Backoff unit in milliseconds; attempt `n` waits `n * retry_delay_ms`
    #[serde(default = "defaults::retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-attempt request timeout in seconds
    #[serde(default = "defaults::timeout_secs")]
    pub timeout_secs: u64,

    /// Pause after acquiring a permit, before the first attempt
    #[serde(default = "defaults::request_delay_ms")]
    pub request_delay_ms: u64,

    /// Policy for master-list entries lacking a scheme code
    #[serde(default)]
    pub missing_id_policy: MissingIdPolicy,
}

impl FetchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::concurrency(),
            retry_count: defaults::retry_count(),
            retry_delay_ms: defaults::retry_delay_ms(),
            timeout_secs: defaults::timeout_secs(),
            request_delay_ms: defaults::request_delay_ms(),
            missing_id_policy: MissingIdPolicy::default(),
        }
    }
}

/// Recency filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Maximum age in days of the latest NAV for a scheme to count as active
    #[serde(default = "defaults::threshold_days")]
    pub threshold_days: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            threshold_days: defaults::threshold_days(),
        }
    }
}

/// Database sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string, e.g. `sqlite://funds.db`. Required.
    #[serde(default)]
    pub url: Option<String>,

    /// Logical database name, reported alongside the table
    #[serde(default = "defaults::database_name")]
    pub name: String,

    /// Target table; replaced wholesale on every run
    #[serde(default = "defaults::collection")]
    pub collection: String,
}

impl DatabaseConfig {
    /// The connection string, or a configuration error if none was supplied.
    pub fn require_url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                AppError::config("database.url is not set (use --database-url or DATABASE_URL)")
            })
    }

    fn validate(&self) -> Result<()> {
        self.require_url()?;
        if !is_identifier(&self.collection) {
            return Err(AppError::validation(format!(
                "database.collection '{}' must be alphanumeric or '_' and not start with a digit",
                self.collection
            )));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::validation("database.name is empty"));
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            name: defaults::database_name(),
            collection: defaults::collection(),
        }
    }
}

/// Backup file and progress reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON backup of the published result set, overwritten every run
    #[serde(default = "defaults::backup_file")]
    pub backup_file: String,

    /// Log a progress line every N completed schemes
    #[serde(default = "defaults::progress_every")]
    pub progress_every: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backup_file: defaults::backup_file(),
            progress_every: defaults::progress_every(),
        }
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

mod defaults {
    // API defaults
    pub fn base_url() -> String {
        "https://api.mfapi.in/mf".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; fund-updater/0.1)".into()
    }

    // Fetch defaults
    pub fn concurrency() -> usize {
        10
    }
    pub fn retry_count() -> u32 {
        4
    }
    pub fn retry_delay_ms() -> u64 {
        3000
    }
    pub fn timeout_secs() -> u64 {
        30
    }
    pub fn request_delay_ms() -> u64 {
        50
    }

    // Filter defaults
    pub fn threshold_days() -> u32 {
        14
    }

    // Database defaults
    pub fn database_name() -> String {
        "test".into()
    }
    pub fn collection() -> String {
        "py_active_fund".into()
    }

    // Output defaults
    pub fn backup_file() -> String {
        "active_funds_backup.json".into()
    }
    pub fn progress_every() -> usize {
        100
    }
}
