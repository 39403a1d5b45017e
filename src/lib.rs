pub mod api;
pub mod utils;
pub mod workflow;

// Re-export commonly used types
pub use api::{ApiError, ApiResult, Basket, Credentials, DataBuffetClient, Order, OrderStream};
pub use utils::Config;
pub use workflow::{BasketRunner, PollPolicy, RunReport};
