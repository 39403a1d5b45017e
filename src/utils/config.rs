use crate::api::auth::Credentials;
use crate::api::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.economy.com/data/v1";

/// Prefix for environment overrides, e.g. `DATABUFFET__CREDENTIALS__ACCESS_KEY`
pub const ENV_PREFIX: &str = "DATABUFFET";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "ApiConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "ApiConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Extra attempts for rate-limited or transient failures
    #[serde(default = "ApiConfig::default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "ApiConfig::default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "ApiConfig::default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl ApiConfig {
    fn default_base_url() -> String {
        DEFAULT_BASE_URL.to_string()
    }

    fn default_request_timeout_secs() -> u64 {
        30
    }

    fn default_max_retries() -> u32 {
        5
    }

    fn default_retry_base_delay_ms() -> u64 {
        1_000
    }

    fn default_retry_max_delay_ms() -> u64 {
        10_000
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            request_timeout_secs: Self::default_request_timeout_secs(),
            max_retries: Self::default_max_retries(),
            retry_base_delay_ms: Self::default_retry_base_delay_ms(),
            retry_max_delay_ms: Self::default_retry_max_delay_ms(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub encryption_key: String,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_credentials().fmt(f)
    }
}

impl CredentialsConfig {
    pub fn to_credentials(&self) -> Credentials {
        Credentials::new(self.access_key.clone(), self.encryption_key.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "PollingConfig::default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "PollingConfig::default_interval_ms")]
    pub max_interval_ms: u64,
    /// 1.0 keeps a fixed interval
    #[serde(default = "PollingConfig::default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "PollingConfig::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "PollingConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl PollingConfig {
    fn default_interval_ms() -> u64 {
        1_000
    }

    fn default_backoff_multiplier() -> f64 {
        1.0
    }

    fn default_max_attempts() -> u32 {
        600
    }

    fn default_timeout_secs() -> u64 {
        600
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::default_interval_ms(),
            max_interval_ms: Self::default_interval_ms(),
            backoff_multiplier: Self::default_backoff_multiplier(),
            max_attempts: Self::default_max_attempts(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "LoggingConfig::default_output")]
    pub output: String,
    #[serde(default)]
    pub file_path: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }

    fn default_output() -> String {
        "pretty".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            output: Self::default_output(),
            file_path: String::new(),
        }
    }
}

impl Config {
    /// Load from an optional TOML file layered with `DATABUFFET__*` variables
    pub fn load_from(path: Option<&Path>) -> ApiResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let cfg = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: Config = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> ApiResult<Self> {
        let config: Config =
            toml::from_str(contents).map_err(|e| ApiError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ApiResult<()> {
        if self.credentials.to_credentials().is_empty() {
            return Err(ApiError::InvalidConfig(
                "access_key and encryption_key are required".into(),
            ));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ApiError::InvalidConfig(
                "api.request_timeout_secs must be positive".into(),
            ));
        }
        if self.polling.max_attempts == 0 || self.polling.timeout_secs == 0 {
            return Err(ApiError::InvalidConfig(
                "polling.max_attempts and polling.timeout_secs must be positive".into(),
            ));
        }
        if self.polling.backoff_multiplier < 1.0 {
            return Err(ApiError::InvalidConfig(
                "polling.backoff_multiplier must be at least 1.0".into(),
            ));
        }
        Ok(())
    }
}
