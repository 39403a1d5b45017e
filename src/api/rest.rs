use crate::api::auth::{self, Credentials};
use crate::api::error::{ApiError, ApiResult};
use crate::api::stream::OrderStream;
use crate::api::types::{Basket, Order};
use crate::utils::config::{ApiConfig, Config};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Retry schedule for rate-limited and transient failures
#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl From<&ApiConfig> for RetrySettings {
    fn from(config: &ApiConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay(),
            max_delay: config.retry_max_delay(),
        }
    }
}

/// Data Buffet REST API client
///
/// Every request carries freshly signed `AccessKeyId`, `TimeStamp` and
/// `Signature` headers.
pub struct DataBuffetClient {
    client: Client,
    credentials: Credentials,
    base_url: Url,
    retry: RetrySettings,
}

impl DataBuffetClient {
    /// Create new REST client
    pub fn new(credentials: Credentials, api: &ApiConfig) -> ApiResult<Self> {
        if credentials.is_empty() {
            return Err(ApiError::InvalidConfig("credentials must not be empty".into()));
        }

        let base_url = Url::parse(&api.base_url)
            .map_err(|e| ApiError::InvalidConfig(format!("base_url {}: {}", api.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidConfig(format!(
                "base_url {} cannot carry a path",
                api.base_url
            )));
        }

        let client = Client::builder().timeout(api.request_timeout()).build()?;

        Ok(Self {
            client,
            credentials,
            base_url,
            retry: RetrySettings::from(api),
        })
    }

    pub fn from_config(config: &Config) -> ApiResult<Self> {
        Self::new(config.credentials.to_credentials(), &config.api)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check the service is reachable and accepts our signature
    pub async fn health(&self) -> ApiResult<()> {
        let url = self.endpoint(&["health"], &[])?;
        self.send_signed(Method::GET, url, "health").await?;
        Ok(())
    }

    /// List baskets as the raw JSON body
    pub async fn list_baskets_raw(&self) -> ApiResult<String> {
        let url = self.endpoint(&["baskets"], &[])?;
        let response = self.send_signed(Method::GET, url, "baskets").await?;
        Ok(response.text().await?)
    }

    /// List baskets available to this account
    pub async fn list_baskets(&self) -> ApiResult<Vec<Basket>> {
        let url = self.endpoint(&["baskets"], &[])?;
        self.get_json(url, "baskets").await
    }

    /// List baskets whose output uses the given file type id
    pub async fn list_baskets_filtered(&self, filetype: u32) -> ApiResult<Vec<Basket>> {
        let filetype = filetype.to_string();
        let url = self.endpoint(&["baskets"], &[("filetype", &filetype)])?;
        self.get_json(url, "baskets").await
    }

    pub async fn get_basket(&self, basket_id: &str) -> ApiResult<Basket> {
        let url = self.endpoint(&["baskets", basket_id], &[])?;
        self.get_json(url, &format!("baskets/{basket_id}")).await
    }

    /// Series mnemonics stored in a basket, as the service returns them
    pub async fn get_basket_contents(&self, basket_id: &str) -> ApiResult<Value> {
        let url = self.endpoint(&["baskets", basket_id, "contents"], &[])?;
        self.get_json(url, &format!("baskets/{basket_id}/contents")).await
    }

    /// Output file types a basket can be configured with
    pub async fn list_file_types(&self) -> ApiResult<Value> {
        let url = self.endpoint(&["filetypes"], &[("type", "baskets")])?;
        self.get_json(url, "filetypes").await
    }

    pub async fn list_orders(&self) -> ApiResult<Vec<Order>> {
        let url = self.endpoint(&["orders"], &[])?;
        self.get_json(url, "orders").await
    }

    /// Submit an order that runs the basket
    ///
    /// POST with an empty body; the server answers with the new order.
    pub async fn submit_order(&self, basket_id: &str) -> ApiResult<Order> {
        let url = self.endpoint(
            &["orders"],
            &[("id", basket_id), ("type", "baskets"), ("action", "run")],
        )?;

        info!("Submitting order for basket {}", basket_id);
        let response = self.send_signed(Method::POST, url, "orders").await?;
        let order: Order = decode(response, "submit order").await?;
        info!("Order {} accepted for basket {}", order.order_id, basket_id);

        Ok(order)
    }

    pub async fn get_order_status(&self, order_id: &str) -> ApiResult<Order> {
        let url = self.endpoint(&["orders", order_id], &[])?;
        self.get_json(url, &format!("orders/{order_id}")).await
    }

    /// Open the content of the most recent finished order for a basket
    pub async fn stream_order_result(&self, basket_id: &str) -> ApiResult<OrderStream> {
        let url = self.endpoint(&["orders"], &[("id", basket_id), ("type", "baskets")])?;
        let response = self
            .send_signed(Method::GET, url, &format!("order result for basket {basket_id}"))
            .await?;
        Ok(OrderStream::new(response))
    }

    /// Open the basket's stored output file
    pub async fn download_output_file(&self, basket_id: &str) -> ApiResult<OrderStream> {
        let url = self.endpoint(&["baskets", basket_id, "output-file"], &[])?;
        let response = self
            .send_signed(Method::GET, url, &format!("baskets/{basket_id}/output-file"))
            .await?;
        Ok(OrderStream::new(response))
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidConfig("base_url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, resource: &str) -> ApiResult<T> {
        let response = self.send_signed(Method::GET, url, resource).await?;
        decode(response, resource).await
    }

    /// Send with retries. Each attempt is re-signed with a new timestamp.
    ///
    /// A POST creates an order, so it is only repeated when the server
    /// refused it outright with 429.
    async fn send_signed(&self, method: Method, url: Url, resource: &str) -> ApiResult<Response> {
        let mut attempt: u32 = 0;
        let mut delay = self.retry.base_delay;

        loop {
            match self.send_once(method.clone(), url.clone(), resource).await {
                Ok(response) => return Ok(response),
                Err(e) if should_retry(&method, &e) && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        "{} {} failed: {}. Retry {}/{} in {:?}",
                        method, resource, e, attempt, self.retry.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.retry.max_delay);
                }
                Err(e) => {
                    error!("{} {} failed: {}", method, resource, e);
                    return Err(e);
                }
            }
        }
    }

    async fn send_once(&self, method: Method, url: Url, resource: &str) -> ApiResult<Response> {
        debug!("{} {}", method, url);

        let mut request = self.client.request(method.clone(), url);
        if method == Method::POST {
            request = request.header(CONTENT_LENGTH, "0");
        }

        let response = auth::signed_headers(&self.credentials)
            .apply(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read error body for {} ({}): {}", resource, status, e);
                String::new()
            }
        };
        Err(ApiError::from_status(status, body, resource))
    }
}

fn should_retry(method: &Method, error: &ApiError) -> bool {
    if *method == Method::POST {
        matches!(error, ApiError::RateLimited)
    } else {
        error.is_retryable()
    }
}

async fn decode<T: DeserializeOwned>(response: Response, context: &str) -> ApiResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| ApiError::Decode {
        context: context.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> DataBuffetClient {
        let api = ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        };
        DataBuffetClient::new(Credentials::new("test_access", "test_secret"), &api).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = client("https://api.economy.com/data/v1");
        assert_eq!(client.base_url().as_str(), "https://api.economy.com/data/v1");
        assert_eq!(client.credentials.access_key, "test_access");
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let result = DataBuffetClient::new(Credentials::new("", "secret"), &ApiConfig::default());
        assert!(matches!(result, Err(ApiError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let api = ApiConfig {
            base_url: "not a url".into(),
            ..ApiConfig::default()
        };
        let result = DataBuffetClient::new(Credentials::new("a", "b"), &api);
        assert!(matches!(result, Err(ApiError::InvalidConfig(_))));
    }

    #[test]
    fn test_endpoint_paths() {
        let client = client("https://api.economy.com/data/v1/");

        let url = client.endpoint(&["baskets"], &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.economy.com/data/v1/baskets");

        let url = client.endpoint(&["orders", "abc123"], &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.economy.com/data/v1/orders/abc123");
    }

    #[test]
    fn test_submit_order_query() {
        let client = client("https://api.economy.com/data/v1");
        let url = client
            .endpoint(&["orders"], &[("id", "42"), ("type", "baskets"), ("action", "run")])
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.economy.com/data/v1/orders?id=42&type=baskets&action=run"
        );
    }

    #[test]
    fn test_post_retried_only_when_rate_limited() {
        let server_error = ApiError::Http {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };

        assert!(should_retry(&Method::GET, &server_error));
        assert!(should_retry(&Method::GET, &ApiError::RateLimited));
        assert!(!should_retry(&Method::POST, &server_error));
        assert!(should_retry(&Method::POST, &ApiError::RateLimited));
    }

    #[test]
    fn test_ids_are_escaped() {
        let client = client("https://api.economy.com/data/v1");

        let url = client.endpoint(&["orders", "a/b c"], &[]).unwrap();
        assert_eq!(url.path(), "/data/v1/orders/a%2Fb%20c");

        let url = client.endpoint(&["orders"], &[("id", "x&y")]).unwrap();
        assert_eq!(url.query(), Some("id=x%26y"));
    }
}
