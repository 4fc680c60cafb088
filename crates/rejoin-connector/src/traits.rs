//! Source capability traits
//!
//! One capability set per source kind. The reconciliation and cleanup
//! engines depend only on these traits; concrete adapters live in their own
//! crates and carry no decision logic.

use async_trait::async_trait;
use uuid::Uuid;

use rejoin_core::models::{CmDevice, DirectoryDevice, InventoryDevice};

use crate::error::ConnectorResult;

/// Base trait for all source adapters.
#[async_trait]
pub trait Source: Send + Sync {
    /// Get the display name for this adapter instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the source system.
    ///
    /// Returns `Ok(())` if the source is reachable and credentials are
    /// accepted, or an error describing what went wrong.
    async fn test_connection(&self) -> ConnectorResult<()>;
}

/// The directory of record (on-premises Active Directory).
#[async_trait]
pub trait DirectorySource: Source {
    /// Fetch all computer accounts matching the configured filter.
    ///
    /// Individual entries that cannot be mapped are dropped with a warning;
    /// the fetch fails only on transport or authentication errors.
    async fn fetch_computers(&self) -> ConnectorResult<Vec<DirectoryDevice>>;
}

/// The cloud identity directory (Entra ID device registry).
#[async_trait]
pub trait CloudDeviceSource: Source {
    /// Fetch all registered devices.
    async fn fetch_devices(&self) -> ConnectorResult<Vec<InventoryDevice>>;

    /// Delete a device record by its identifier.
    async fn delete_device(&self, id: Uuid) -> ConnectorResult<()>;
}

/// The endpoint management service (Intune managed devices).
#[async_trait]
pub trait ManagedDeviceSource: Source {
    /// Fetch all managed devices.
    async fn fetch_managed_devices(&self) -> ConnectorResult<Vec<InventoryDevice>>;

    /// Delete a managed device record by its identifier.
    async fn delete_managed_device(&self, id: Uuid) -> ConnectorResult<()>;
}

/// The configuration-management site (SCCM AdminService).
#[async_trait]
pub trait SiteDeviceSource: Source {
    /// Fetch device records matching an OData filter expression.
    async fn fetch_devices_where(&self, filter: &str) -> ConnectorResult<Vec<CmDevice>>;

    /// Delete a device record by site resource id.
    ///
    /// Returns `Ok(false)` when the record no longer exists.
    async fn delete_device_by_resource_id(&self, resource_id: i64) -> ConnectorResult<bool>;
}
