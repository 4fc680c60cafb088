//! AdminService REST client.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use rejoin_connector::error::{ConnectorError, ConnectorResult};
use rejoin_connector::traits::{SiteDeviceSource, Source};
use rejoin_core::models::CmDevice;

use crate::config::SccmConfig;

/// OData collection envelope returned by the AdminService.
#[derive(Debug, Deserialize)]
struct ODataCollection<T> {
    value: Vec<T>,
}

/// Site device source backed by the SCCM AdminService.
#[derive(Debug)]
pub struct SccmAdminClient {
    config: SccmConfig,
    http_client: reqwest::Client,
    display_name: String,
}

impl SccmAdminClient {
    /// Create a new AdminService client.
    pub fn new(config: SccmConfig) -> ConnectorResult<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .danger_accept_invalid_certs(config.allow_invalid_certificates)
            .build()
            .map_err(|e| {
                ConnectorError::invalid_configuration(format!(
                    "failed to create HTTP client: {e}"
                ))
            })?;

        let display_name = format!("SCCM: {}", config.base_url);

        Ok(Self {
            config,
            http_client,
            display_name,
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .http_client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(username, Some(password.expose_secret()));
        }

        request
    }

    fn map_transport_error(err: reqwest::Error) -> ConnectorError {
        if err.is_timeout() {
            ConnectorError::ConnectionTimeout { timeout_secs: 60 }
        } else if err.is_connect() {
            ConnectorError::connection_failed_with_source("AdminService request failed", err)
        } else {
            ConnectorError::operation_failed_with_source("AdminService request failed", err)
        }
    }
}

#[async_trait]
impl Source for SccmAdminClient {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        let url = format!("{}/Devices", self.config.service_root());
        let response = self
            .request(reqwest::Method::GET, &url)
            .query(&[("$top", "1")])
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            reqwest::StatusCode::UNAUTHORIZED => Err(ConnectorError::AuthenticationFailed),
            status => Err(ConnectorError::connection_failed(format!(
                "AdminService responded with {status}"
            ))),
        }
    }
}

#[async_trait]
impl SiteDeviceSource for SccmAdminClient {
    #[instrument(skip(self))]
    async fn fetch_devices_where(&self, filter: &str) -> ConnectorResult<Vec<CmDevice>> {
        let url = format!("{}/Devices", self.config.service_root());

        let mut request = self.request(reqwest::Method::GET, &url);
        if !filter.trim().is_empty() {
            request = request.query(&[("$filter", filter)]);
        }

        debug!(filter = %filter, "Querying AdminService devices");

        let response = request.send().await.map_err(Self::map_transport_error)?;

        match response.status() {
            status if status.is_success() => {}
            reqwest::StatusCode::UNAUTHORIZED => {
                return Err(ConnectorError::AuthenticationFailed)
            }
            status => {
                return Err(ConnectorError::operation_failed(format!(
                    "AdminService device query failed with {status}"
                )))
            }
        }

        let collection: ODataCollection<CmDevice> = response
            .json()
            .await
            .map_err(|e| ConnectorError::Serialization {
                message: format!("failed to decode AdminService payload: {e}"),
            })?;

        info!(fetched = collection.value.len(), "Fetched devices from AdminService");

        Ok(collection.value)
    }

    #[instrument(skip(self))]
    async fn delete_device_by_resource_id(&self, resource_id: i64) -> ConnectorResult<bool> {
        let url = format!(
            "{}/wmi/Devices({})",
            self.config.service_root(),
            resource_id
        );

        let response = self
            .request(reqwest::Method::DELETE, &url)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            reqwest::StatusCode::UNAUTHORIZED => Err(ConnectorError::AuthenticationFailed),
            status if status.is_success() => Ok(true),
            status => Err(ConnectorError::operation_failed(format!(
                "AdminService delete of resource {resource_id} failed with {status}"
            ))),
        }
    }
}
