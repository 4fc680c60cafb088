//! rejoin Core Library
//!
//! Shared types for the rejoin device reconciliation service.
//!
//! # Modules
//!
//! - [`models`] - Domain records (directory devices, inventory devices, snapshots)
//! - [`options`] - Configuration options for all components

pub mod models;
pub mod options;

// Re-export main types for convenient access
pub use models::{
    CmDevice, DirectoryDevice, InventoryDevice, InventorySource, Snapshot, SnapshotMetrics,
};
pub use options::{
    CleanupOptions, DirectoryOptions, GraphOptions, RejoinOptions, SccmOptions, SchedulerOptions,
    SnapshotOptions,
};
