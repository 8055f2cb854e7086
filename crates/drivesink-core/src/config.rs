//! Configuration module for DriveSink.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for DriveSink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub sync: SyncConfig,
    pub drive: DriveConfig,
    pub bucket: BucketConfig,
    pub transfer: TransferConfig,
    pub retry: RetryConfig,
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub state: StateConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between delta polling cycles.
    pub poll_interval: u64,
    /// Maximum concurrent per-file reconciliations within a cycle.
    pub workers: u32,
}

/// Source drive (Microsoft Graph) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Azure AD Application (client) ID. `None` until the user runs `drivesink login`.
    pub app_id: Option<String>,
    /// OAuth redirect URI; must match the app registration.
    pub redirect_uri: String,
    /// Delegated scopes requested at authorization.
    pub scopes: Vec<String>,
}

/// Destination bucket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Destination bucket name.
    pub name: String,
    /// Bucket region.
    pub region: String,
    /// Optional key prefix prepended to every mirrored object key.
    pub key_prefix: Option<String>,
}

/// Upload transfer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Files above this size (in MiB) are uploaded in parts.
    pub multipart_threshold_mb: u64,
    /// Size of each upload part (in MiB).
    pub part_size_mb: u64,
    /// Maximum number of parts a single multipart upload may use.
    pub max_parts: u32,
}

/// Retry / backoff settings for transient API failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per operation (first try included).
    pub max_attempts: u32,
    /// Base delay in milliseconds; doubles on each retry.
    pub base_delay_ms: u64,
    /// Ceiling on the backoff delay in milliseconds.
    pub max_delay_ms: u64,
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Token lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Access tokens are refreshed when within this many seconds of expiry.
    pub refresh_margin_secs: u64,
}

/// Durable state file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Path of the persisted OAuth token set.
    pub token_path: PathBuf,
    /// Path of the persisted delta cursor.
    pub cursor_path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drivesink/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("drivesink")
            .join("config.yaml")
    }

    /// Multipart threshold in bytes.
    pub fn multipart_threshold_bytes(&self) -> u64 {
        self.transfer.multipart_threshold_mb * 1024 * 1024
    }

    /// Part size in bytes.
    pub fn part_size_bytes(&self) -> u64 {
        self.transfer.part_size_mb * 1024 * 1024
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: 300,
            workers: 4,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            redirect_uri: "http://localhost:8080/callback".to_string(),
            scopes: vec![
                "Files.Read".to_string(),
                "offline_access".to_string(),
            ],
        }
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            region: "us-east-1".to_string(),
            key_prefix: None,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            multipart_threshold_mb: 100,
            part_size_mb: 10,
            max_parts: 10_000,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_margin_secs: 300,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("drivesink");
        Self {
            token_path: data_dir.join("tokens.json"),
            cursor_path: data_dir.join("cursor.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.poll_interval"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.poll_interval == 0 {
            errors.push(ValidationError {
                field: "sync.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.workers == 0 {
            errors.push(ValidationError {
                field: "sync.workers".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- drive ---
        if self.drive.redirect_uri.is_empty() {
            errors.push(ValidationError {
                field: "drive.redirect_uri".into(),
                message: "must not be empty".into(),
            });
        }
        if self.drive.scopes.is_empty() {
            errors.push(ValidationError {
                field: "drive.scopes".into(),
                message: "at least one scope is required".into(),
            });
        }

        // --- bucket ---
        if self.bucket.name.is_empty() {
            errors.push(ValidationError {
                field: "bucket.name".into(),
                message: "must not be empty".into(),
            });
        }
        if let Some(prefix) = &self.bucket.key_prefix {
            if prefix.starts_with('/') {
                errors.push(ValidationError {
                    field: "bucket.key_prefix".into(),
                    message: "must not start with '/'".into(),
                });
            }
        }

        // --- transfer ---
        if self.transfer.multipart_threshold_mb == 0 {
            errors.push(ValidationError {
                field: "transfer.multipart_threshold_mb".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.transfer.part_size_mb == 0 {
            errors.push(ValidationError {
                field: "transfer.part_size_mb".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.transfer.part_size_mb > self.transfer.multipart_threshold_mb {
            errors.push(ValidationError {
                field: "transfer.part_size_mb".into(),
                message: format!(
                    "part_size_mb ({}) must not exceed multipart_threshold_mb ({})",
                    self.transfer.part_size_mb, self.transfer.multipart_threshold_mb
                ),
            });
        }
        if self.transfer.max_parts == 0 {
            errors.push(ValidationError {
                field: "transfer.max_parts".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- retry ---
        if self.retry.max_attempts == 0 {
            errors.push(ValidationError {
                field: "retry.max_attempts".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.retry.base_delay_ms == 0 {
            errors.push(ValidationError {
                field: "retry.base_delay_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            errors.push(ValidationError {
                field: "retry.max_delay_ms".into(),
                message: format!(
                    "max_delay_ms ({}) must be at least base_delay_ms ({})",
                    self.retry.max_delay_ms, self.retry.base_delay_ms
                ),
            });
        }

        // --- http ---
        if self.http.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "http.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- auth ---
        if self.auth.refresh_margin_secs == 0 {
            errors.push(ValidationError {
                field: "auth.refresh_margin_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use drivesink_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .bucket_name("my-mirror-bucket")
///     .sync_poll_interval(60)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_poll_interval(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval = seconds;
        self
    }

    pub fn sync_workers(mut self, n: u32) -> Self {
        self.config.sync.workers = n;
        self
    }

    // --- drive ---

    pub fn drive_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.config.drive.app_id = Some(app_id.into());
        self
    }

    pub fn drive_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.drive.redirect_uri = uri.into();
        self
    }

    pub fn drive_scopes(mut self, scopes: Vec<String>) -> Self {
        self.config.drive.scopes = scopes;
        self
    }

    // --- bucket ---

    pub fn bucket_name(mut self, name: impl Into<String>) -> Self {
        self.config.bucket.name = name.into();
        self
    }

    pub fn bucket_region(mut self, region: impl Into<String>) -> Self {
        self.config.bucket.region = region.into();
        self
    }

    pub fn bucket_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.bucket.key_prefix = Some(prefix.into());
        self
    }

    // --- transfer ---

    pub fn transfer_multipart_threshold_mb(mut self, mb: u64) -> Self {
        self.config.transfer.multipart_threshold_mb = mb;
        self
    }

    pub fn transfer_part_size_mb(mut self, mb: u64) -> Self {
        self.config.transfer.part_size_mb = mb;
        self
    }

    pub fn transfer_max_parts(mut self, n: u32) -> Self {
        self.config.transfer.max_parts = n;
        self
    }

    // --- retry ---

    pub fn retry_max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n;
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry.base_delay_ms = ms;
        self
    }

    pub fn retry_max_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry.max_delay_ms = ms;
        self
    }

    // --- state ---

    pub fn state_token_path(mut self, path: PathBuf) -> Self {
        self.config.state.token_path = path;
        self
    }

    pub fn state_cursor_path(mut self, path: PathBuf) -> Self {
        self.config.state.cursor_path = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
