pub mod auth;
pub mod error;
pub mod rest;
pub mod stream;
pub mod types;

pub use auth::{sign, Credentials, SignedHeaders};
pub use error::{ApiError, ApiResult};
pub use rest::{DataBuffetClient, RetrySettings};
pub use stream::OrderStream;
pub use types::{Basket, Order};
