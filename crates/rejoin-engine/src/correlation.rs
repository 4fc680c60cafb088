//! Correlation engine
//!
//! Builds lookup indices over one source's device set and decides whether a
//! directory device has a corresponding record in that source. Pure
//! functions, no I/O; deterministic given their inputs.

use std::collections::HashSet;

use uuid::Uuid;

use rejoin_core::models::{DirectoryDevice, InventoryDevice};

/// Derived lookup structure built from one inventory's device set for one
/// reconciliation pass. Never persisted.
#[derive(Debug, Clone)]
pub struct CorrelationIndex {
    linked_ids: HashSet<Uuid>,
    /// Display names, lowercased for case-insensitive matching.
    display_names: HashSet<String>,
}

impl CorrelationIndex {
    /// Build an index from an inventory device set.
    ///
    /// Blank display names are not indexed.
    #[must_use]
    pub fn build(devices: &[InventoryDevice]) -> Self {
        let mut linked_ids = HashSet::new();
        let mut display_names = HashSet::new();

        for device in devices {
            if let Some(id) = device.cloud_device_id {
                linked_ids.insert(id);
            }
            if !device.display_name.trim().is_empty() {
                display_names.insert(device.display_name.to_lowercase());
            }
        }

        Self {
            linked_ids,
            display_names,
        }
    }

    /// Decide whether a directory device is present in the indexed source.
    ///
    /// Precedence, first match wins:
    /// 1. the device's own object GUID appears in the linked-identifier set
    ///    (unifies the sources that key records by the directory identifier);
    /// 2. the device's linked cloud-device identifier appears in the
    ///    linked-identifier set;
    /// 3. the device's DNS host name matches a display name;
    /// 4. the device's account name matches a display name.
    ///
    /// Identifier matches are checked before name matches so that renamed
    /// hosts do not produce false negatives.
    #[must_use]
    pub fn matches(&self, device: &DirectoryDevice) -> bool {
        if self.linked_ids.contains(&device.object_guid) {
            return true;
        }

        if let Some(cloud_id) = device.cloud_device_id {
            if self.linked_ids.contains(&cloud_id) {
                return true;
            }
        }

        if let Some(dns_name) = &device.dns_host_name {
            if !dns_name.trim().is_empty()
                && self.display_names.contains(&dns_name.to_lowercase())
            {
                return true;
            }
        }

        self.display_names
            .contains(&device.account_name.to_lowercase())
    }
}

/// Decide whether an inventory device still has a counterpart in the active
/// directory set (the reverse of [`CorrelationIndex::matches`], used by the
/// cleanup policy engine).
///
/// A counterpart exists when the linked cloud identifiers are equal, or when
/// the inventory display name matches the directory device's DNS host name
/// or account name case-insensitively.
#[must_use]
pub fn has_active_directory_counterpart(
    device: &InventoryDevice,
    active: &[DirectoryDevice],
) -> bool {
    if let Some(cloud_id) = device.cloud_device_id {
        if active
            .iter()
            .any(|account| account.cloud_device_id == Some(cloud_id))
        {
            return true;
        }
    }

    if device.display_name.trim().is_empty() {
        return false;
    }

    active.iter().any(|account| {
        account
            .dns_host_name
            .as_deref()
            .is_some_and(|dns| dns.eq_ignore_ascii_case(&device.display_name))
            || account
                .account_name
                .eq_ignore_ascii_case(&device.display_name)
    })
}
