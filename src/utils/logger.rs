use crate::api::error::{ApiError, ApiResult};
use crate::utils::config::LoggingConfig;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging system
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logger(level: &str, json_output: bool, log_file: Option<&Path>) -> ApiResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match (json_output, log_file) {
        (true, Some(file)) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)?;

            registry
                .with(fmt::layer().json().with_writer(file))
                .try_init()
        }
        (true, None) => registry.with(fmt::layer().json()).try_init(),
        (false, Some(file)) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)?;

            registry
                .with(fmt::layer().with_ansi(false).with_writer(file))
                .try_init()
        }
        (false, None) => registry
            .with(fmt::layer().compact().with_target(false))
            .try_init(),
    };

    result.map_err(|e| ApiError::InvalidConfig(format!("logger already initialized: {e}")))
}

/// Initialize logger from config
pub fn init_from_config(config: &LoggingConfig) -> ApiResult<()> {
    let json = config.output == "json";
    let log_file = if !config.file_path.is_empty() {
        Some(Path::new(&config.file_path))
    } else {
        None
    };

    init_logger(&config.level, json, log_file)
}
