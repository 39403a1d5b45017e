use crate::api::error::{ApiError, ApiResult};
use crate::api::rest::DataBuffetClient;
use crate::api::types::Order;
use crate::utils::config::PollingConfig;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Bounds and pacing for order status polling
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_interval: Duration,
    pub backoff_multiplier: f64,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollPolicy {
    fn from(config: &PollingConfig) -> Self {
        let interval = Duration::from_millis(config.interval_ms);
        Self {
            interval,
            max_interval: Duration::from_millis(config.max_interval_ms).max(interval),
            backoff_multiplier: config.backoff_multiplier.max(1.0),
            max_attempts: config.max_attempts.max(1),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl PollPolicy {
    /// Fixed interval, no growth
    pub fn fixed(interval: Duration, max_attempts: u32, timeout: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            backoff_multiplier: 1.0,
            max_attempts,
            timeout,
        }
    }

    pub fn next_interval(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// Poll `fetch_status` until the order reports `dateFinished`.
///
/// Retryable failures use up an attempt and polling continues; anything
/// else aborts. Exhausting attempts or time yields `OrderTimeout`; the time
/// budget also cuts off a status check that is still in flight.
pub async fn poll_until_finished<F, Fut>(
    order_id: &str,
    policy: &PollPolicy,
    mut fetch_status: F,
) -> ApiResult<Order>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<Order>>,
{
    let started = Instant::now();
    let mut interval = policy.interval;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        let remaining = policy.timeout.saturating_sub(started.elapsed());
        let Ok(status) = tokio::time::timeout(remaining, fetch_status()).await else {
            warn!("Status check {} for order {} outlived the poll budget", attempts, order_id);
            return Err(ApiError::OrderTimeout {
                order_id: order_id.to_string(),
                attempts,
                elapsed: started.elapsed(),
            });
        };

        match status {
            Ok(order) if order.is_finished() => {
                info!(
                    "Order {} finished at {} after {} status checks",
                    order_id,
                    order.date_finished.as_deref().unwrap_or_default(),
                    attempts
                );
                return Ok(order);
            }
            Ok(order) => {
                debug!(
                    "Order {} still pending (processing: {:?}, queue: {:?})",
                    order_id, order.processing, order.queue_status
                );
            }
            Err(e) if e.is_retryable() => {
                warn!("Status check {} for order {} failed: {}", attempts, order_id, e);
            }
            Err(e) => return Err(e),
        }

        let elapsed = started.elapsed();
        if attempts >= policy.max_attempts || elapsed + interval > policy.timeout {
            return Err(ApiError::OrderTimeout {
                order_id: order_id.to_string(),
                attempts,
                elapsed,
            });
        }

        tokio::time::sleep(interval).await;
        interval = policy.next_interval(interval);
    }
}

/// Wait for an order submitted through `client`
pub async fn wait_for_order(
    client: &DataBuffetClient,
    order_id: &str,
    policy: &PollPolicy,
) -> ApiResult<Order> {
    poll_until_finished(order_id, policy, move || client.get_order_status(order_id)).await
}
