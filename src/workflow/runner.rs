use crate::api::error::ApiResult;
use crate::api::rest::DataBuffetClient;
use crate::api::types::Order;
use crate::workflow::poller::{wait_for_order, PollPolicy};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// Outcome of a completed submit → poll → fetch run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub basket_id: String,
    pub order: Order,
    pub output: PathBuf,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

/// Drives one basket order from submission to a file on disk.
///
/// Requests are issued strictly one at a time.
pub struct BasketRunner {
    client: DataBuffetClient,
    policy: PollPolicy,
}

impl BasketRunner {
    pub fn new(client: DataBuffetClient, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    pub fn client(&self) -> &DataBuffetClient {
        &self.client
    }

    /// List baskets, submit an order for `basket_id`, wait for it and save
    /// the result to `output`.
    pub async fn run(&self, basket_id: &str, output: impl AsRef<Path>) -> ApiResult<RunReport> {
        let started = Instant::now();
        let output = output.as_ref();

        let baskets = self.client.list_baskets().await?;
        info!("{} baskets available", baskets.len());
        if let Some(basket) = baskets.iter().find(|b| b.basket_id == basket_id) {
            info!(
                "Running basket {} ({})",
                basket_id,
                basket.name.as_deref().unwrap_or("unnamed")
            );
        }

        let submitted = self.client.submit_order(basket_id).await?;
        let order = wait_for_order(&self.client, &submitted.order_id, &self.policy).await?;

        let bytes_written = self
            .client
            .stream_order_result(basket_id)
            .await?
            .write_to_file(output)
            .await?;

        let elapsed = started.elapsed();
        info!(
            "Basket {} order {} saved to {} in {:?}",
            basket_id,
            order.order_id,
            output.display(),
            elapsed
        );

        Ok(RunReport {
            basket_id: basket_id.to_string(),
            order,
            output: output.to_path_buf(),
            bytes_written,
            elapsed,
        })
    }

    /// Fetch the latest finished result for `basket_id` without ordering
    pub async fn download(&self, basket_id: &str, output: impl AsRef<Path>) -> ApiResult<u64> {
        self.client
            .stream_order_result(basket_id)
            .await?
            .write_to_file(output)
            .await
    }
}
