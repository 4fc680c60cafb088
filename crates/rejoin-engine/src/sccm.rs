//! Configuration-management maintenance sweeps
//!
//! Standalone sweeps over the site inventory, independent of snapshots:
//! remove records the site has flagged obsolete, and records whose client
//! is inactive. No cross-source freshness guard applies here; the site is
//! not compared against the directory.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use rejoin_connector::traits::SiteDeviceSource;

use crate::error::EngineResult;
use crate::reconcile::ensure_not_cancelled;

const OBSOLETE_FILTER: &str = "IsObsolete eq 1";
const INACTIVE_FILTER: &str = "ClientActiveStatus eq 0";

/// Runs maintenance sweeps against the configuration-management site.
pub struct SccmCleanupEngine {
    site: Arc<dyn SiteDeviceSource>,
}

impl SccmCleanupEngine {
    /// Create a new sweep engine.
    pub fn new(site: Arc<dyn SiteDeviceSource>) -> Self {
        Self { site }
    }

    /// Delete all records the site has flagged obsolete.
    ///
    /// Returns the number of records actually deleted.
    #[instrument(skip_all)]
    pub async fn cleanup_obsolete(&self, cancel: &CancellationToken) -> EngineResult<usize> {
        self.sweep(OBSOLETE_FILTER, "obsolete", cancel).await
    }

    /// Delete all records whose site client is inactive.
    #[instrument(skip_all)]
    pub async fn cleanup_inactive(&self, cancel: &CancellationToken) -> EngineResult<usize> {
        self.sweep(INACTIVE_FILTER, "inactive", cancel).await
    }

    async fn sweep(
        &self,
        filter: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<usize> {
        ensure_not_cancelled(cancel)?;

        let devices = self.site.fetch_devices_where(filter).await?;
        let mut deleted = 0usize;

        for device in devices {
            ensure_not_cancelled(cancel)?;

            match self.site.delete_device_by_resource_id(device.resource_id).await {
                Ok(true) => {
                    deleted += 1;
                    info!(
                        resource_id = device.resource_id,
                        name = device.name.as_deref().unwrap_or(""),
                        "Deleted {label} site device"
                    );
                }
                Ok(false) => {
                    debug!(
                        resource_id = device.resource_id,
                        "Site device already gone"
                    );
                }
                Err(e) => {
                    error!(
                        resource_id = device.resource_id,
                        error = %e,
                        "Failed to delete site device, continuing"
                    );
                }
            }
        }

        info!(deleted, "Completed {label} site sweep");

        Ok(deleted)
    }
}
