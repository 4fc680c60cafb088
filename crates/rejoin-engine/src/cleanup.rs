//! Cleanup policy engine
//!
//! Consumes a snapshot and decides which inventory records are safe to
//! delete. Deletion is conservative: a record is only removed when no
//! active directory counterpart exists AND the cross-source freshness guard
//! does not fire. Per-record failures never abort a sweep.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use rejoin_connector::traits::{CloudDeviceSource, ManagedDeviceSource};
use rejoin_core::models::{InventoryDevice, Snapshot};
use rejoin_core::options::CleanupOptions;

use crate::correlation::has_active_directory_counterpart;
use crate::error::EngineResult;
use crate::reconcile::ensure_not_cancelled;

/// Counters for one target's cleanup sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Records deleted from the target.
    pub deleted: usize,
    /// Records that would have been deleted in dry-run mode.
    pub would_delete: usize,
    /// Deletions suppressed by the freshness guard (inconsistencies).
    pub suppressed: usize,
    /// Records skipped because an active directory counterpart exists.
    pub skipped_active: usize,
    /// Delete calls that failed; the sweep continued past them.
    pub failed: usize,
}

/// Outcome of one cleanup pass across both targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub entra: SweepOutcome,
    pub intune: SweepOutcome,
}

/// Build the freshness map: linked identifier to the most recent
/// endpoint-management check-in across all matching records.
pub(crate) fn build_freshness_map(
    devices: &[InventoryDevice],
) -> HashMap<Uuid, DateTime<Utc>> {
    let mut map: HashMap<Uuid, DateTime<Utc>> = HashMap::new();

    for device in devices {
        let (Some(id), Some(seen)) = (device.cloud_device_id, device.last_seen_at) else {
            continue;
        };
        map.entry(id)
            .and_modify(|existing| {
                if seen > *existing {
                    *existing = seen;
                }
            })
            .or_insert(seen);
    }

    map
}

/// Applies the cleanup policy to a snapshot.
pub struct CleanupEngine {
    entra: Arc<dyn CloudDeviceSource>,
    intune: Arc<dyn ManagedDeviceSource>,
    options: CleanupOptions,
}

impl CleanupEngine {
    /// Create a new cleanup engine.
    pub fn new(
        entra: Arc<dyn CloudDeviceSource>,
        intune: Arc<dyn ManagedDeviceSource>,
        options: CleanupOptions,
    ) -> Self {
        Self {
            entra,
            intune,
            options,
        }
    }

    /// Run cleanup over the given snapshot.
    ///
    /// No-op when cleanup is globally disabled. Each enabled target is
    /// processed independently; a per-record delete failure is counted and
    /// the sweep continues. Returns early only on cancellation.
    #[instrument(skip_all)]
    pub async fn perform_cleanup(
        &self,
        snapshot: &Snapshot,
        cancel: &CancellationToken,
    ) -> EngineResult<CleanupReport> {
        let mut report = CleanupReport::default();

        if !self.options.enabled {
            info!("Cleanup disabled. Skipping.");
            return Ok(report);
        }

        let fresh_cutoff = Utc::now() - Duration::days(self.options.fresh_window_days);
        let intune_by_linked_id = build_freshness_map(&snapshot.intune_devices);

        if self.options.delete_entra {
            report.entra = self
                .sweep_entra(snapshot, &intune_by_linked_id, fresh_cutoff, cancel)
                .await?;
        }

        if self.options.delete_intune {
            report.intune = self.sweep_intune(snapshot, fresh_cutoff, cancel).await?;
        }

        Ok(report)
    }

    /// Sweep the Entra ID device registry.
    ///
    /// The freshness guard looks up the device's linked identifier in the
    /// Intune check-in map: a fresh check-in there means the directory
    /// record merely failed to replicate while the device is demonstrably
    /// in use, so the deletion is suppressed.
    async fn sweep_entra(
        &self,
        snapshot: &Snapshot,
        intune_by_linked_id: &HashMap<Uuid, DateTime<Utc>>,
        fresh_cutoff: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> EngineResult<SweepOutcome> {
        let mut outcome = SweepOutcome::default();

        for device in &snapshot.entra_devices {
            ensure_not_cancelled(cancel)?;

            if has_active_directory_counterpart(device, &snapshot.directory_devices) {
                outcome.skipped_active += 1;
                continue;
            }

            let intune_fresh = device
                .cloud_device_id
                .and_then(|id| intune_by_linked_id.get(&id))
                .is_some_and(|seen| *seen >= fresh_cutoff);

            if intune_fresh {
                warn!(
                    cloud_device_id = ?device.cloud_device_id,
                    name = %device.display_name,
                    "Inconsistency: directory stale/missing but endpoint check-in fresh; Entra deletion suppressed"
                );
                outcome.suppressed += 1;
                continue;
            }

            if self.options.dry_run {
                info!(
                    id = %device.id,
                    name = %device.display_name,
                    "Would delete Entra device: stale/missing in directory, no fresh endpoint check-in"
                );
                outcome.would_delete += 1;
                continue;
            }

            match self.entra.delete_device(device.id).await {
                Ok(()) => {
                    info!(
                        id = %device.id,
                        name = %device.display_name,
                        "Deleted Entra device: stale/missing in directory, no fresh endpoint check-in"
                    );
                    outcome.deleted += 1;
                }
                Err(e) => {
                    error!(
                        id = %device.id,
                        name = %device.display_name,
                        error = %e,
                        "Failed to delete Entra device, continuing"
                    );
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }

    /// Sweep the Intune managed device inventory.
    ///
    /// Here the freshness guard is the device's own last check-in.
    async fn sweep_intune(
        &self,
        snapshot: &Snapshot,
        fresh_cutoff: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> EngineResult<SweepOutcome> {
        let mut outcome = SweepOutcome::default();

        for device in &snapshot.intune_devices {
            ensure_not_cancelled(cancel)?;

            if has_active_directory_counterpart(device, &snapshot.directory_devices) {
                outcome.skipped_active += 1;
                continue;
            }

            let fresh = device.last_seen_at.is_some_and(|seen| seen >= fresh_cutoff);
            if fresh {
                warn!(
                    id = %device.id,
                    name = %device.display_name,
                    "Inconsistency: directory stale/missing but device check-in fresh; Intune deletion suppressed"
                );
                outcome.suppressed += 1;
                continue;
            }

            if self.options.dry_run {
                info!(
                    id = %device.id,
                    name = %device.display_name,
                    "Would delete Intune device: stale/missing in directory, no fresh check-in"
                );
                outcome.would_delete += 1;
                continue;
            }

            match self.intune.delete_managed_device(device.id).await {
                Ok(()) => {
                    info!(
                        id = %device.id,
                        name = %device.display_name,
                        "Deleted Intune device: stale/missing in directory, no fresh check-in"
                    );
                    outcome.deleted += 1;
                }
                Err(e) => {
                    error!(
                        id = %device.id,
                        name = %device.display_name,
                        error = %e,
                        "Failed to delete Intune device, continuing"
                    );
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }
}
