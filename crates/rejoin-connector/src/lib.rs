//! rejoin Source Adapter Framework
//!
//! Capability-based trait definitions for the inventory sources the
//! reconciliation engine consumes, plus the shared error taxonomy with
//! transient/permanent classification. The engine depends only on these
//! traits; each backing system provides one concrete adapter crate.

pub mod error;
pub mod traits;

// Re-exports
pub use error::{ConnectorError, ConnectorResult};
pub use traits::{
    CloudDeviceSource, DirectorySource, ManagedDeviceSource, SiteDeviceSource, Source,
};
