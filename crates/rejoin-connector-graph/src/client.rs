//! Microsoft Graph HTTP client with pagination and retry handling.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

use crate::auth::TokenCache;
use crate::config::GraphConfig;
use crate::error::{GraphError, GraphResult};

/// `OData` error response from Microsoft Graph.
#[derive(Debug, Deserialize)]
struct ODataError {
    error: ODataErrorBody,
}

/// `OData` error body.
#[derive(Debug, Deserialize)]
struct ODataErrorBody {
    code: String,
    message: String,
}

/// Response wrapper for paginated Graph API responses.
#[derive(Debug, Deserialize)]
pub struct ODataResponse<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Microsoft Graph API client.
#[derive(Debug)]
pub struct GraphClient {
    http_client: reqwest::Client,
    token_cache: Arc<TokenCache>,
    base_url: String,
    max_retries: u32,
}

impl GraphClient {
    /// Creates a new Graph client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: GraphConfig) -> GraphResult<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GraphError::Config(format!("failed to create HTTP client: {e}")))?;

        let base_url = config.base_url.clone();
        let token_cache = Arc::new(TokenCache::new(config, http_client.clone()));

        Ok(Self {
            http_client,
            token_cache,
            base_url,
            max_retries: 5,
        })
    }

    /// Returns the base URL for Graph API requests.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs a GET request with token injection and retry handling.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> GraphResult<T> {
        let response = self.request_with_retry(reqwest::Method::GET, url).await?;
        response.json().await.map_err(GraphError::from)
    }

    /// Performs a DELETE request with token injection and retry handling.
    #[instrument(skip(self))]
    pub async fn delete(&self, url: &str) -> GraphResult<()> {
        // Usually 204 No Content; the body is discarded either way
        let _ = self.request_with_retry(reqwest::Method::DELETE, url).await?;
        Ok(())
    }

    /// Internal method that performs the request with retry logic.
    ///
    /// Retries throttled (429, honoring `Retry-After`) and transient gateway
    /// (502/503/504) responses with exponential backoff, up to the retry
    /// budget.
    async fn request_with_retry(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> GraphResult<reqwest::Response> {
        let mut retries = 0u32;
        let mut delay = Duration::from_secs(1);

        loop {
            let token = self.token_cache.get_token().await?;

            let response = self
                .http_client
                .request(method.clone(), url)
                .bearer_auth(&token)
                .send()
                .await?;

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if retries >= self.max_retries {
                    return Err(GraphError::MaxRetriesExceeded { attempts: retries });
                }
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map_or(delay, Duration::from_secs);

                retries += 1;
                warn!(
                    "Throttled by Graph, retry {}/{} after {:?}",
                    retries, self.max_retries, retry_after
                );
                tokio::time::sleep(retry_after).await;
                delay *= 2;
                continue;
            }

            if matches!(
                status,
                reqwest::StatusCode::BAD_GATEWAY
                    | reqwest::StatusCode::SERVICE_UNAVAILABLE
                    | reqwest::StatusCode::GATEWAY_TIMEOUT
            ) && retries < self.max_retries
            {
                retries += 1;
                warn!(
                    "Transient error {}, retry {}/{} after {:?}",
                    status, retries, self.max_retries, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }

            if status.is_success() {
                return Ok(response);
            }

            let error_body = response.text().await.unwrap_or_default();
            if let Ok(odata_error) = serde_json::from_str::<ODataError>(&error_body) {
                return Err(GraphError::Api {
                    code: odata_error.error.code,
                    message: odata_error.error.message,
                });
            }

            return Err(GraphError::Api {
                code: status.to_string(),
                message: error_body,
            });
        }
    }
}
