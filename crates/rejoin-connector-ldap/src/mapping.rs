//! LDAP entry mapping
//!
//! Converts raw directory search entries into [`DirectoryDevice`] records.
//! Unmappable entries are dropped by the caller with a warning; nothing in
//! here performs I/O.

use chrono::{DateTime, NaiveDateTime, Utc};
use ldap3::SearchEntry;
use uuid::Uuid;

use rejoin_core::models::DirectoryDevice;

/// Seconds between the Windows FILETIME epoch (1601-01-01) and the Unix epoch.
const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

/// Convert a Windows FILETIME value (100ns ticks since 1601) to UTC.
///
/// Directory objects that have never logged on carry a zero value, which
/// maps to "no activity recorded" rather than the year 1601.
pub(crate) fn filetime_to_datetime(filetime: i64) -> Option<DateTime<Utc>> {
    if filetime <= 0 {
        return None;
    }
    let secs = filetime / 10_000_000 - FILETIME_UNIX_OFFSET_SECS;
    let nanos = (filetime % 10_000_000) * 100;
    DateTime::from_timestamp(secs, nanos as u32)
}

/// Parse an LDAP generalized-time value such as `20250601083000.0Z`.
pub(crate) fn parse_generalized_time(value: &str) -> Option<DateTime<Utc>> {
    if value.len() < 14 {
        return None;
    }
    NaiveDateTime::parse_from_str(&value[..14], "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Interpret a 16-byte directory GUID value.
///
/// Active Directory stores GUIDs in mixed-endian order (the first three
/// fields little-endian), matching the on-wire objectGUID attribute.
pub(crate) fn guid_from_bytes(bytes: &[u8]) -> Option<Uuid> {
    let array: [u8; 16] = bytes.try_into().ok()?;
    Some(Uuid::from_bytes_le(array))
}

fn first_str<'a>(entry: &'a SearchEntry, attribute: &str) -> Option<&'a str> {
    entry
        .attrs
        .get(attribute)
        .and_then(|values| values.first())
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
}

fn first_bin<'a>(entry: &'a SearchEntry, attribute: &str) -> Option<&'a [u8]> {
    entry
        .bin_attrs
        .get(attribute)
        .and_then(|values| values.first())
        .map(Vec::as_slice)
}

/// Extract a GUID-valued attribute that the server may return as either a
/// binary value or a string rendering.
fn guid_attr(entry: &SearchEntry, attribute: &str) -> Option<Uuid> {
    if let Some(bytes) = first_bin(entry, attribute) {
        return guid_from_bytes(bytes);
    }
    first_str(entry, attribute).and_then(|value| Uuid::parse_str(value).ok())
}

/// Map a directory search entry to a [`DirectoryDevice`].
///
/// Returns `None` when the entry lacks the identifying attributes (object
/// GUID, SAM account name, distinguished name).
pub(crate) fn map_entry(entry: &SearchEntry) -> Option<DirectoryDevice> {
    let object_guid = guid_attr(entry, "objectGUID")?;
    let account_name = first_str(entry, "sAMAccountName")?.to_string();
    let distinguished_name = first_str(entry, "distinguishedName")?.to_string();

    let last_activity_at = first_str(entry, "lastLogonTimestamp")
        .and_then(|value| value.parse::<i64>().ok())
        .and_then(filetime_to_datetime);

    let changed_at = first_str(entry, "whenChanged").and_then(parse_generalized_time);

    Some(DirectoryDevice {
        object_guid,
        account_name,
        distinguished_name,
        dns_host_name: first_str(entry, "dNSHostName").map(str::to_string),
        operating_system: first_str(entry, "operatingSystem").map(str::to_string),
        operating_system_version: first_str(entry, "operatingSystemVersion").map(str::to_string),
        last_activity_at,
        changed_at,
        cloud_device_id: guid_attr(entry, "msDS-DeviceId"),
    })
}
