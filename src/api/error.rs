use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Failure taxonomy for Data Buffet API calls
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, timeout or body read failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server rejected the credentials or the signature
    #[error("authentication failed ({status}): {body}")]
    Authentication { status: StatusCode, body: String },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("rate limited by server")]
    RateLimited,

    #[error("unexpected HTTP status {status}: {body}")]
    Http { status: StatusCode, body: String },

    /// 2xx response whose body did not match the expected shape
    #[error("malformed response for {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("order {order_id} did not finish after {attempts} status checks ({elapsed:?})")]
    OrderTimeout {
        order_id: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ApiResult<T, E = ApiError> = Result<T, E>;

impl ApiError {
    /// Classify a non-2xx response
    pub fn from_status(status: StatusCode, body: String, resource: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ApiError::Authentication { status, body }
            }
            StatusCode::NOT_FOUND => ApiError::NotFound {
                resource: resource.to_string(),
            },
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited,
            _ => ApiError::Http { status, body },
        }
    }

    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(e) => !e.is_builder(),
            ApiError::RateLimited => true,
            ApiError::Http { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}
