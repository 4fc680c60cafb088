//! rejoin Reconciliation Engine
//!
//! The decision core of the service:
//!
//! - [`correlation`] - lookup indices and the multi-tier presence check
//! - [`reconcile`] - the reconciliation orchestrator producing snapshots
//! - [`cleanup`] - the conservative cleanup policy engine
//! - [`sccm`] - standalone configuration-management maintenance sweeps
//! - [`store`] - durable, auditable snapshot persistence
//! - [`worker`] - the periodic driver running one pass at a time
//!
//! The engine depends only on the source traits in `rejoin-connector`;
//! all I/O adapters live in their own crates.

pub mod cleanup;
pub mod correlation;
pub mod error;
pub mod reconcile;
pub mod sccm;
pub mod store;
pub mod worker;

// Re-exports
pub use cleanup::{CleanupEngine, CleanupReport, SweepOutcome};
pub use correlation::{has_active_directory_counterpart, CorrelationIndex};
pub use error::{EngineError, EngineResult, StoreError, StoreResult};
pub use reconcile::Reconciler;
pub use sccm::SccmCleanupEngine;
pub use store::{FileSnapshotStore, SnapshotStore};
pub use worker::ReconcileWorker;
