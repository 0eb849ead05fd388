//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)
//! 4. Platform variables (`PORT`, `GCLOUD_STORAGE_BUCKET`)

use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub registry: RegistryConfig,
    #[serde(default)]
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

/// Object storage configuration
///
/// The store is reached through its S3-compatible API. For Google Cloud
/// Storage this is the XML interoperability endpoint with HMAC keys.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Bucket receiving the archived reports
    pub bucket: String,
    /// S3-compatible API endpoint
    pub endpoint: String,
    /// Signing region ("auto" for GCS and R2)
    pub region: String,
    /// Host used to build public object URLs
    pub public_host: String,
    /// HMAC access key ID
    pub access_key_id: String,
    /// HMAC secret
    pub secret_access_key: String,
}

impl StorageConfig {
    /// Public URL of an object in the configured bucket
    ///
    /// # Returns
    /// URL like "https://storage.googleapis.com/my-bucket/2023-06-01.json"
    pub fn public_url(&self, key: &str) -> String {
        format!("https://{}/{}/{}", self.public_host, self.bucket, key)
    }
}

/// Action registry client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry API (e.g., "https://registry.example.com/v1")
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Report date configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReportConfig {
    /// Timezone used to compute "yesterday" when no date is requested
    #[serde(default)]
    pub timezone: ReportTimezone,
}

/// Timezone selector for the default report date
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportTimezone {
    #[default]
    Utc,
    Local,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (ACTION_ARCHIVE__*)
    /// 5. `PORT` and `GCLOUD_STORAGE_BUCKET` as set by the hosting platform
    ///
    /// # Errors
    /// Returns error if configuration is missing or invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let port = std::env::var("PORT").ok();
        let bucket = std::env::var("GCLOUD_STORAGE_BUCKET")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("storage.endpoint", "https://storage.googleapis.com")?
            .set_default("storage.region", "auto")?
            .set_default("storage.public_host", "storage.googleapis.com")?
            .set_default("registry.timeout_seconds", 30)?
            .set_default("report.timezone", "utc")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (ACTION_ARCHIVE__*)
            .add_source(
                Environment::with_prefix("ACTION_ARCHIVE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", port)?
            .set_override_option("storage.bucket", bucket)?
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        if self.storage.bucket.trim().is_empty() {
            return Err(AppError::Config(
                "storage.bucket must be set (or GCLOUD_STORAGE_BUCKET)".to_string(),
            ));
        }

        if self.storage.public_host.trim().is_empty() {
            return Err(AppError::Config(
                "storage.public_host must not be empty".to_string(),
            ));
        }

        if self.storage.access_key_id.trim().is_empty()
            || self.storage.secret_access_key.trim().is_empty()
        {
            return Err(AppError::Config(
                "storage.access_key_id and storage.secret_access_key are required".to_string(),
            ));
        }

        url::Url::parse(&self.storage.endpoint).map_err(|e| {
            AppError::Config(format!("storage.endpoint is not a valid URL: {}", e))
        })?;

        let registry_url = url::Url::parse(&self.registry.base_url).map_err(|e| {
            AppError::Config(format!("registry.base_url is not a valid URL: {}", e))
        })?;
        if !matches!(registry_url.scheme(), "http" | "https") {
            return Err(AppError::Config(
                "registry.base_url must use http or https".to_string(),
            ));
        }

        if self.registry.timeout_seconds == 0 {
            return Err(AppError::Config(
                "registry.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
