//! Microsoft Graph adapters for rejoin
//!
//! Implements the cloud device source traits over the Microsoft Graph API:
//!
//! - [`EntraDeviceSource`] - the Entra ID device registry (`/devices`)
//! - [`IntuneDeviceSource`] - Intune managed devices
//!   (`/deviceManagement/managedDevices`)
//!
//! Both share an `OAuth2` client-credentials token cache and a paged OData
//! client with retry handling for throttling and transient gateway errors.

mod auth;
mod client;
mod config;
mod devices;
mod error;
mod managed_devices;

// Re-exports
pub use auth::TokenCache;
pub use client::{GraphClient, ODataResponse};
pub use config::GraphConfig;
pub use devices::EntraDeviceSource;
pub use error::{GraphError, GraphResult};
pub use managed_devices::IntuneDeviceSource;
