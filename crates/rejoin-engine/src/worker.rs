//! Periodic reconciliation worker
//!
//! Drives one reconcile-and-cleanup pass at a time; passes never overlap.
//! A failed pass is logged and the loop continues; the next tick retries
//! naturally. All waits race against the cancellation token.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use rejoin_core::options::SchedulerOptions;

use crate::cleanup::CleanupEngine;
use crate::error::EngineError;
use crate::reconcile::Reconciler;
use crate::sccm::SccmCleanupEngine;

/// Fallback interval when the configured interval is zero.
const FALLBACK_INTERVAL_SECS: u64 = 1800;

/// The periodic driver for the reconciliation service.
pub struct ReconcileWorker {
    reconciler: Reconciler,
    cleanup: CleanupEngine,
    sccm: Option<SccmCleanupEngine>,
    options: SchedulerOptions,
}

impl ReconcileWorker {
    /// Create a new worker.
    pub fn new(
        reconciler: Reconciler,
        cleanup: CleanupEngine,
        sccm: Option<SccmCleanupEngine>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            reconciler,
            cleanup,
            sccm,
            options,
        }
    }

    /// Run until the cancellation token fires.
    #[instrument(skip_all)]
    pub async fn run(&self, cancel: CancellationToken) {
        let startup_delay = Duration::from_secs(self.options.startup_delay_secs);
        if !startup_delay.is_zero() {
            info!(delay_secs = self.options.startup_delay_secs, "Worker delaying startup");
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(startup_delay) => {}
            }
        }

        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.run_pass(&cancel).await;

            let interval_secs = if self.options.interval_secs == 0 {
                FALLBACK_INTERVAL_SECS
            } else {
                self.options.interval_secs
            };

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(Duration::from_secs(interval_secs)) => {}
            }
        }

        info!("Worker stopped");
    }

    /// One reconcile-and-cleanup pass. Failures are logged, never propagated;
    /// the scheduler retries on the next tick.
    async fn run_pass(&self, cancel: &CancellationToken) {
        let snapshot = match self.reconciler.reconcile(cancel).await {
            Ok(snapshot) => snapshot,
            Err(EngineError::Cancelled) => {
                info!("Reconciliation cancelled");
                return;
            }
            Err(e) => {
                error!(error = %e, "Reconciliation failed");
                return;
            }
        };

        info!(
            directory = snapshot.metrics.directory_count,
            entra = snapshot.metrics.entra_count,
            intune = snapshot.metrics.intune_count,
            missing_entra = snapshot.metrics.missing_in_entra_count,
            missing_intune = snapshot.metrics.missing_in_intune_count,
            "Snapshot captured"
        );

        match self.cleanup.perform_cleanup(&snapshot, cancel).await {
            Ok(report) => {
                info!(
                    entra_deleted = report.entra.deleted,
                    entra_would_delete = report.entra.would_delete,
                    entra_suppressed = report.entra.suppressed,
                    intune_deleted = report.intune.deleted,
                    intune_would_delete = report.intune.would_delete,
                    intune_suppressed = report.intune.suppressed,
                    "Cleanup pass completed"
                );
            }
            Err(EngineError::Cancelled) => {
                info!("Cleanup cancelled");
                return;
            }
            Err(e) => error!(error = %e, "Cleanup pass failed"),
        }

        if let Some(sccm) = &self.sccm {
            match sccm.cleanup_obsolete(cancel).await {
                Ok(deleted) => info!(deleted, "Obsolete site sweep completed"),
                Err(EngineError::Cancelled) => {
                    info!("Site sweep cancelled");
                    return;
                }
                Err(e) => error!(error = %e, "Obsolete site sweep failed"),
            }

            match sccm.cleanup_inactive(cancel).await {
                Ok(deleted) => info!(deleted, "Inactive site sweep completed"),
                Err(EngineError::Cancelled) => info!("Site sweep cancelled"),
                Err(e) => error!(error = %e, "Inactive site sweep failed"),
            }
        }
    }
}
