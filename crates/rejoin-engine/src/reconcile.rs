//! Reconciliation orchestrator
//!
//! Fetches from all sources, filters the directory set to active devices,
//! computes the missing sets per target, and persists the resulting
//! snapshot. All-or-nothing per run: a fetch or persistence failure fails
//! the whole pass and no partial snapshot is produced.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use rejoin_connector::traits::{CloudDeviceSource, DirectorySource, ManagedDeviceSource};
use rejoin_core::models::{DirectoryDevice, Snapshot, SnapshotMetrics};

use crate::correlation::CorrelationIndex;
use crate::error::{EngineError, EngineResult};
use crate::store::SnapshotStore;

/// A directory device is active when it has an activity timestamp within
/// the window. The cutoff boundary is inclusive.
fn is_active(device: &DirectoryDevice, cutoff: DateTime<Utc>) -> bool {
    device.last_activity_at.is_some_and(|ts| ts >= cutoff)
}

/// Orchestrates one reconciliation pass over all sources.
pub struct Reconciler {
    directory: Arc<dyn DirectorySource>,
    entra: Arc<dyn CloudDeviceSource>,
    intune: Arc<dyn ManagedDeviceSource>,
    store: Arc<dyn SnapshotStore>,
    activity_window: Duration,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(
        directory: Arc<dyn DirectorySource>,
        entra: Arc<dyn CloudDeviceSource>,
        intune: Arc<dyn ManagedDeviceSource>,
        store: Arc<dyn SnapshotStore>,
        activity_window_days: i64,
    ) -> Self {
        Self {
            directory,
            entra,
            intune,
            store,
            activity_window: Duration::days(activity_window_days),
        }
    }

    /// Run one reconciliation pass and return the persisted snapshot.
    ///
    /// Fails if any source fetch fails or the snapshot cannot be saved.
    #[instrument(skip_all)]
    pub async fn reconcile(&self, cancel: &CancellationToken) -> EngineResult<Snapshot> {
        let started = std::time::Instant::now();
        let cutoff = Utc::now() - self.activity_window;

        info!(cutoff = %cutoff, "Starting reconciliation");

        ensure_not_cancelled(cancel)?;
        let directory_devices = self.directory.fetch_computers().await?;

        ensure_not_cancelled(cancel)?;
        let entra_devices = self.entra.fetch_devices().await?;

        ensure_not_cancelled(cancel)?;
        let intune_devices = self.intune.fetch_managed_devices().await?;

        let fetched = directory_devices.len();
        let active: Vec<DirectoryDevice> = directory_devices
            .into_iter()
            .filter(|device| is_active(device, cutoff))
            .collect();
        let stale_count = fetched - active.len();

        let entra_index = CorrelationIndex::build(&entra_devices);
        let intune_index = CorrelationIndex::build(&intune_devices);

        let missing_in_entra: Vec<DirectoryDevice> = active
            .iter()
            .filter(|device| !entra_index.matches(device))
            .cloned()
            .collect();
        let missing_in_intune: Vec<DirectoryDevice> = active
            .iter()
            .filter(|device| !intune_index.matches(device))
            .cloned()
            .collect();

        let metrics = SnapshotMetrics {
            directory_count: active.len(),
            entra_count: entra_devices.len(),
            intune_count: intune_devices.len(),
            missing_in_entra_count: missing_in_entra.len(),
            missing_in_intune_count: missing_in_intune.len(),
            stale_count,
        };

        let snapshot = Snapshot {
            captured_at: Utc::now(),
            directory_devices: active,
            entra_devices,
            intune_devices,
            missing_in_entra,
            missing_in_intune,
            metrics,
        };

        // The snapshot is the run's only durable record; a save failure
        // fails the whole pass.
        self.store.save(&snapshot).await?;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            directory = metrics.directory_count,
            entra = metrics.entra_count,
            intune = metrics.intune_count,
            missing_entra = metrics.missing_in_entra_count,
            missing_intune = metrics.missing_in_intune_count,
            stale = metrics.stale_count,
            "Reconciliation finished"
        );

        Ok(snapshot)
    }
}

pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> EngineResult<()> {
    if cancel.is_cancelled() {
        Err(EngineError::Cancelled)
    } else {
        Ok(())
    }
}
