//! Domain records shared across the rejoin workspace.
//!
//! These records are produced by the source adapters and consumed by the
//! reconciliation and cleanup engines. They are immutable after creation and
//! are only persisted as part of a [`Snapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A computer account discovered in the on-premises directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryDevice {
    /// The object GUID of the computer account.
    pub object_guid: Uuid,
    /// The SAM account name (sAMAccountName).
    pub account_name: String,
    /// The distinguished name of the computer account.
    pub distinguished_name: String,
    /// The DNS host name, when registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_host_name: Option<String>,
    /// The reported operating system caption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
    /// The reported operating system version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system_version: Option<String>,
    /// The last logon timestamp converted to UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<DateTime<Utc>>,
    /// The time the object was last changed in the directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_at: Option<DateTime<Utc>>,
    /// The cloud device identifier stamped on hybrid-joined accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_device_id: Option<Uuid>,
}

/// The cloud inventory a device record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InventorySource {
    /// The cloud identity directory (Entra ID device registry).
    EntraId,
    /// The endpoint management service (Intune managed devices).
    Intune,
}

impl std::fmt::Display for InventorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventorySource::EntraId => write!(f, "entra_id"),
            InventorySource::Intune => write!(f, "intune"),
        }
    }
}

/// A device discovered from a cloud inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDevice {
    /// The unique identifier of the record in its source.
    pub id: Uuid,
    /// The friendly device name.
    pub display_name: String,
    /// The linked directory/cloud device identifier, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_device_id: Option<Uuid>,
    /// The reported operating system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
    /// The reported operating system version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system_version: Option<String>,
    /// The last time the device checked in with its source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Which inventory produced this record.
    pub source: InventorySource,
}

/// Pre-computed counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetrics {
    /// Number of directory devices in scope (the active set).
    pub directory_count: usize,
    /// Total number of Entra ID devices fetched.
    pub entra_count: usize,
    /// Total number of Intune devices fetched.
    pub intune_count: usize,
    /// Number of active directory devices missing from Entra ID.
    pub missing_in_entra_count: usize,
    /// Number of active directory devices missing from Intune.
    pub missing_in_intune_count: usize,
    /// Number of directory devices excluded as stale by the activity window.
    pub stale_count: usize,
}

/// The immutable, persisted result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// When the pass captured its source data.
    pub captured_at: DateTime<Utc>,
    /// The filtered active directory device set.
    pub directory_devices: Vec<DirectoryDevice>,
    /// All Entra ID devices fetched during the pass.
    pub entra_devices: Vec<InventoryDevice>,
    /// All Intune devices fetched during the pass.
    pub intune_devices: Vec<InventoryDevice>,
    /// Active directory devices with no correlated Entra ID record.
    pub missing_in_entra: Vec<DirectoryDevice>,
    /// Active directory devices with no correlated Intune record.
    pub missing_in_intune: Vec<DirectoryDevice>,
    /// Counters derived from the sets above.
    pub metrics: SnapshotMetrics,
}

/// A device record from the configuration-management site (SCCM AdminService).
///
/// Field names follow the AdminService OData payload, which uses PascalCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmDevice {
    /// The site resource identifier.
    #[serde(rename = "ResourceId")]
    pub resource_id: i64,
    /// The device name, when present.
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the site client is reporting as active (1) or not (0).
    #[serde(rename = "ClientActiveStatus", default)]
    pub client_active_status: i64,
    /// Whether the site has flagged the record obsolete (1) or not (0).
    #[serde(rename = "IsObsolete", default)]
    pub is_obsolete: i64,
    /// The last online time reported by the site, as an opaque string.
    #[serde(rename = "LastOnlineTime", default, skip_serializing_if = "Option::is_none")]
    pub last_online_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_directory_device() -> DirectoryDevice {
        DirectoryDevice {
            object_guid: Uuid::new_v4(),
            account_name: "WKS-0042$".to_string(),
            distinguished_name: "CN=WKS-0042,OU=Workstations,DC=corp,DC=example".to_string(),
            dns_host_name: Some("wks-0042.corp.example".to_string()),
            operating_system: Some("Windows 11 Enterprise".to_string()),
            operating_system_version: Some("10.0.26100".to_string()),
            last_activity_at: Some(Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap()),
            changed_at: None,
            cloud_device_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn directory_device_serializes_camel_case() {
        let device = sample_directory_device();
        let json = serde_json::to_value(&device).unwrap();
        assert!(json.get("objectGuid").is_some());
        assert!(json.get("accountName").is_some());
        assert!(json.get("dnsHostName").is_some());
        // Absent optionals are omitted, not null
        assert!(json.get("changedAt").is_none());
    }

    #[test]
    fn inventory_source_round_trips() {
        let json = serde_json::to_string(&InventorySource::EntraId).unwrap();
        assert_eq!(json, "\"entraId\"");
        let back: InventorySource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, InventorySource::EntraId);
        assert_eq!(InventorySource::Intune.to_string(), "intune");
    }

    #[test]
    fn cm_device_parses_admin_service_payload() {
        let payload = r#"{
            "ResourceId": 16777220,
            "Name": "WKS-0042",
            "ClientActiveStatus": 0,
            "IsObsolete": 1,
            "LastOnlineTime": "2025-05-01T00:00:00Z"
        }"#;
        let device: CmDevice = serde_json::from_str(payload).unwrap();
        assert_eq!(device.resource_id, 16_777_220);
        assert_eq!(device.name.as_deref(), Some("WKS-0042"));
        assert_eq!(device.is_obsolete, 1);
    }

    #[test]
    fn cm_device_defaults_missing_flags() {
        let device: CmDevice = serde_json::from_str(r#"{"ResourceId": 1}"#).unwrap();
        assert_eq!(device.client_active_status, 0);
        assert_eq!(device.is_obsolete, 0);
        assert!(device.name.is_none());
    }
}
