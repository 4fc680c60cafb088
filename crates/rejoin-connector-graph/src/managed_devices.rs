//! Intune managed device adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use rejoin_connector::error::ConnectorResult;
use rejoin_connector::traits::{ManagedDeviceSource, Source};
use rejoin_core::models::{InventoryDevice, InventorySource};

use crate::client::{GraphClient, ODataResponse};
use crate::config::GraphConfig;

const SELECT_FIELDS: &str =
    "id,azureADDeviceId,deviceName,operatingSystem,osVersion,lastSyncDateTime";
const PAGE_SIZE: u32 = 999;

/// Raw device payload from the `/deviceManagement/managedDevices` collection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManagedDevice {
    id: String,
    #[serde(rename = "azureADDeviceId")]
    azure_ad_device_id: Option<String>,
    device_name: Option<String>,
    operating_system: Option<String>,
    os_version: Option<String>,
    last_sync_date_time: Option<DateTime<Utc>>,
}

impl RawManagedDevice {
    fn into_record(self) -> Option<InventoryDevice> {
        let id = Uuid::parse_str(&self.id).ok()?;
        let cloud_device_id = self
            .azure_ad_device_id
            .as_deref()
            .and_then(|value| Uuid::parse_str(value).ok());

        Some(InventoryDevice {
            id,
            display_name: self.device_name.unwrap_or_default(),
            cloud_device_id,
            operating_system: self.operating_system,
            operating_system_version: self.os_version,
            last_seen_at: self.last_sync_date_time,
            source: InventorySource::Intune,
        })
    }
}

/// Managed device source backed by Intune.
#[derive(Debug)]
pub struct IntuneDeviceSource {
    client: GraphClient,
    display_name: String,
}

impl IntuneDeviceSource {
    /// Create a new Intune managed device source.
    pub fn new(config: GraphConfig) -> ConnectorResult<Self> {
        let display_name = format!("Intune: {}", config.tenant_id);
        let client = GraphClient::new(config)?;
        Ok(Self {
            client,
            display_name,
        })
    }
}

#[async_trait]
impl Source for IntuneDeviceSource {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        let url = format!(
            "{}/deviceManagement/managedDevices?$select=id&$top=1",
            self.client.base_url()
        );
        let _: ODataResponse<serde_json::Value> = self.client.get(&url).await?;
        Ok(())
    }
}

#[async_trait]
impl ManagedDeviceSource for IntuneDeviceSource {
    #[instrument(skip(self))]
    async fn fetch_managed_devices(&self) -> ConnectorResult<Vec<InventoryDevice>> {
        let mut devices = Vec::new();
        let mut dropped = 0usize;
        let mut url = format!(
            "{}/deviceManagement/managedDevices?$select={}&$top={}",
            self.client.base_url(),
            SELECT_FIELDS,
            PAGE_SIZE
        );

        loop {
            let page: ODataResponse<RawManagedDevice> = self.client.get(&url).await?;

            for raw in page.value {
                let raw_id = raw.id.clone();
                match raw.into_record() {
                    Some(device) => devices.push(device),
                    None => {
                        dropped += 1;
                        warn!(id = %raw_id, "Failed to map managed device record, dropping");
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
            dropped, "Fetched managed devices from Intune"
        );

        Ok(devices)
    }

    #[instrument(skip(self))]
    async fn delete_managed_device(&self, id: Uuid) -> ConnectorResult<()> {
        let url = format!(
            "{}/deviceManagement/managedDevices/{}",
            self.client.base_url(),
            id
        );
        self.client.delete(&url).await?;
        info!(id = %id, "Deleted Intune managed device");
        Ok(())
    }
}
