//! Entra ID device registry adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use rejoin_connector::error::ConnectorResult;
use rejoin_connector::traits::{CloudDeviceSource, Source};
use rejoin_core::models::{InventoryDevice, InventorySource};

use crate::client::{GraphClient, ODataResponse};
use crate::config::GraphConfig;

const SELECT_FIELDS: &str =
    "id,deviceId,displayName,operatingSystem,operatingSystemVersion,approximateLastSignInDateTime";
const PAGE_SIZE: u32 = 999;

/// Raw device payload from the `/devices` collection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntraDevice {
    id: String,
    device_id: Option<String>,
    display_name: Option<String>,
    operating_system: Option<String>,
    operating_system_version: Option<String>,
    approximate_last_sign_in_date_time: Option<DateTime<Utc>>,
}

impl RawEntraDevice {
    fn into_record(self) -> Option<InventoryDevice> {
        let id = Uuid::parse_str(&self.id).ok()?;
        let cloud_device_id = self
            .device_id
            .as_deref()
            .and_then(|value| Uuid::parse_str(value).ok());

        Some(InventoryDevice {
            id,
            display_name: self.display_name.unwrap_or_default(),
            cloud_device_id,
            operating_system: self.operating_system,
            operating_system_version: self.operating_system_version,
            last_seen_at: self.approximate_last_sign_in_date_time,
            source: InventorySource::EntraId,
        })
    }
}

/// Cloud device source backed by the Entra ID device registry.
#[derive(Debug)]
pub struct EntraDeviceSource {
    client: GraphClient,
    display_name: String,
}

impl EntraDeviceSource {
    /// Create a new Entra ID device source.
    pub fn new(config: GraphConfig) -> ConnectorResult<Self> {
        let display_name = format!("Entra ID: {}", config.tenant_id);
        let client = GraphClient::new(config)?;
        Ok(Self {
            client,
            display_name,
        })
    }
}

#[async_trait]
impl Source for EntraDeviceSource {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        let url = format!("{}/devices?$select=id&$top=1", self.client.base_url());
        let _: ODataResponse<serde_json::Value> = self.client.get(&url).await?;
        Ok(())
    }
}

#[async_trait]
impl CloudDeviceSource for EntraDeviceSource {
    #[instrument(skip(self))]
    async fn fetch_devices(&self) -> ConnectorResult<Vec<InventoryDevice>> {
        let mut devices = Vec::new();
        let mut dropped = 0usize;
        let mut url = format!(
            "{}/devices?$select={}&$top={}",
            self.client.base_url(),
            SELECT_FIELDS,
            PAGE_SIZE
        );

        loop {
            let page: ODataResponse<RawEntraDevice> = self.client.get(&url).await?;

            for raw in page.value {
                let raw_id = raw.id.clone();
                match raw.into_record() {
                    Some(device) => devices.push(device),
                    None => {
                        dropped += 1;
                        warn!(id = %raw_id, "Failed to map Entra device record, dropping");
                    }
                }
            }

            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }

        info!(
            fetched = devices.len(),
            dropped, "Fetched devices from Entra ID"
        );

        Ok(devices)
    }

    #[instrument(skip(self))]
    async fn delete_device(&self, id: Uuid) -> ConnectorResult<()> {
        let url = format!("{}/devices/{}", self.client.base_url(), id);
        self.client.delete(&url).await?;
        info!(id = %id, "Deleted Entra device");
        Ok(())
    }
}
