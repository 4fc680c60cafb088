//! Configuration options for the rejoin service.
//!
//! Options are plain data passed to component constructors; no process-wide
//! configuration state exists. All sections deserialize with sensible
//! defaults so a minimal config file only names what it overrides.

use serde::{Deserialize, Serialize};

/// Configuration for the on-premises directory query.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryOptions {
    /// Host name or IP address of the LDAP endpoint.
    pub ldap_server: String,

    /// LDAP port. 636 for LDAPS.
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Negotiate TLS for the LDAP connection.
    #[serde(default = "default_true")]
    pub use_ssl: bool,

    /// Bypass certificate validation. Diagnostics only.
    #[serde(default)]
    pub allow_invalid_certificates: bool,

    /// Distinguished name acting as the query root, e.g. "DC=corp,DC=example".
    pub base_dn: String,

    /// Optional service account bind DN or UPN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Optional service account password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// LDAP filter applied to the query.
    #[serde(default = "default_computer_filter")]
    pub filter: String,

    /// Page size for paged LDAP queries.
    #[serde(default = "default_directory_page_size")]
    pub page_size: u32,

    /// Maximum age in days for last activity to consider a device active.
    #[serde(default = "default_activity_window_days")]
    pub activity_window_days: i64,

    /// Additional attributes to retrieve besides the defaults.
    #[serde(default)]
    pub additional_attributes: Vec<String>,
}

impl std::fmt::Debug for DirectoryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryOptions")
            .field("ldap_server", &self.ldap_server)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("allow_invalid_certificates", &self.allow_invalid_certificates)
            .field("base_dn", &self.base_dn)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***REDACTED***"))
            .field("filter", &self.filter)
            .field("page_size", &self.page_size)
            .field("activity_window_days", &self.activity_window_days)
            .field("additional_attributes", &self.additional_attributes)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    636
}

fn default_true() -> bool {
    true
}

fn default_computer_filter() -> String {
    "(&(objectCategory=computer)(objectClass=computer))".to_string()
}

fn default_directory_page_size() -> u32 {
    500
}

fn default_activity_window_days() -> i64 {
    30
}

/// Configuration for the Microsoft Graph clients (Entra ID and Intune).
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphOptions {
    /// Tenant identifier used for token acquisition.
    pub tenant_id: String,

    /// Application (client) identifier.
    pub client_id: String,

    /// Client secret for the client-credentials flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Timeout applied to Graph requests, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Override for the Graph API base URL. Defaults to the public cloud.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Override for the login authority base URL. Defaults to the public cloud.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
}

impl std::fmt::Debug for GraphOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphOptions")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "***REDACTED***"),
            )
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("base_url", &self.base_url)
            .field("login_url", &self.login_url)
            .finish()
    }
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Configures how snapshots are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOptions {
    /// Directory where snapshot files are stored.
    #[serde(default = "default_snapshot_root")]
    pub root_path: String,

    /// File name used for the most recent snapshot.
    #[serde(default = "default_latest_file_name")]
    pub latest_file_name: String,

    /// Maximum number of historical snapshots to retain. Zero disables pruning.
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            root_path: default_snapshot_root(),
            latest_file_name: default_latest_file_name(),
            history_size: default_history_size(),
        }
    }
}

fn default_snapshot_root() -> String {
    "./data".to_string()
}

fn default_latest_file_name() -> String {
    "latest-snapshot.json".to_string()
}

fn default_history_size() -> usize {
    10
}

/// Controls the cadence of the background reconciliation worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerOptions {
    /// Seconds between passes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds to wait before the first pass.
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            startup_delay_secs: default_startup_delay_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_startup_delay_secs() -> u64 {
    10
}

/// Controls which cleanup actions the policy engine may take.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupOptions {
    /// Master switch. When false the engine logs a skip and does nothing.
    #[serde(default)]
    pub enabled: bool,

    /// Allow deletions from the Entra ID device registry.
    #[serde(default)]
    pub delete_entra: bool,

    /// Allow deletions from the Intune managed device inventory.
    #[serde(default)]
    pub delete_intune: bool,

    /// Record intended deletions without calling any source.
    #[serde(default = "default_true")]
    pub dry_run: bool,

    /// Days within which an endpoint check-in counts as fresh.
    #[serde(default = "default_fresh_window_days")]
    pub fresh_window_days: i64,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            delete_entra: false,
            delete_intune: false,
            dry_run: true,
            fresh_window_days: default_fresh_window_days(),
        }
    }
}

fn default_fresh_window_days() -> i64 {
    30
}

/// Configuration for the optional configuration-management sweeps.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SccmOptions {
    /// Enables the SCCM maintenance sweeps.
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the site's AdminService endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_service_base_url: Option<String>,

    /// Optional service account user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Optional service account password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Bypass certificate validation for self-signed site servers.
    #[serde(default)]
    pub allow_invalid_certificates: bool,

    /// Days without client activity before a record counts as inactive.
    #[serde(default = "default_inactive_days_threshold")]
    pub inactive_days_threshold: i64,

    /// Days before an obsolete record is eligible for removal.
    #[serde(default = "default_obsolete_days_threshold")]
    pub obsolete_days_threshold: i64,
}

impl Default for SccmOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            admin_service_base_url: None,
            username: None,
            password: None,
            allow_invalid_certificates: false,
            inactive_days_threshold: default_inactive_days_threshold(),
            obsolete_days_threshold: default_obsolete_days_threshold(),
        }
    }
}

impl std::fmt::Debug for SccmOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SccmOptions")
            .field("enabled", &self.enabled)
            .field("admin_service_base_url", &self.admin_service_base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***REDACTED***"))
            .field("allow_invalid_certificates", &self.allow_invalid_certificates)
            .field("inactive_days_threshold", &self.inactive_days_threshold)
            .field("obsolete_days_threshold", &self.obsolete_days_threshold)
            .finish()
    }
}

fn default_inactive_days_threshold() -> i64 {
    90
}

fn default_obsolete_days_threshold() -> i64 {
    7
}

/// Top-level configuration envelope for the rejoin worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejoinOptions {
    /// On-premises directory query settings.
    pub directory: DirectoryOptions,

    /// Microsoft Graph client settings.
    pub graph: GraphOptions,

    /// Snapshot persistence settings.
    #[serde(default)]
    pub snapshot: SnapshotOptions,

    /// Worker cadence settings.
    #[serde(default)]
    pub scheduler: SchedulerOptions,

    /// Cleanup policy settings.
    #[serde(default)]
    pub cleanup: CleanupOptions,

    /// Optional configuration-management sweep settings.
    #[serde(default)]
    pub sccm: SccmOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_envelope_applies_defaults() {
        let json = r#"{
            "directory": {
                "ldapServer": "dc01.corp.example",
                "baseDn": "DC=corp,DC=example"
            },
            "graph": {
                "tenantId": "00000000-0000-0000-0000-000000000000",
                "clientId": "11111111-1111-1111-1111-111111111111"
            }
        }"#;

        let options: RejoinOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.directory.port, 636);
        assert!(options.directory.use_ssl);
        assert_eq!(options.directory.page_size, 500);
        assert_eq!(options.directory.activity_window_days, 30);
        assert_eq!(options.graph.request_timeout_secs, 60);
        assert_eq!(options.snapshot.history_size, 10);
        assert_eq!(options.snapshot.latest_file_name, "latest-snapshot.json");
        assert_eq!(options.scheduler.interval_secs, 3600);
        assert!(!options.cleanup.enabled);
        assert!(options.cleanup.dry_run);
        assert_eq!(options.cleanup.fresh_window_days, 30);
        assert!(!options.sccm.enabled);
    }

    #[test]
    fn cleanup_flags_deserialize() {
        let json = r#"{
            "enabled": true,
            "deleteEntra": true,
            "dryRun": false,
            "freshWindowDays": 14
        }"#;
        let cleanup: CleanupOptions = serde_json::from_str(json).unwrap();
        assert!(cleanup.enabled);
        assert!(cleanup.delete_entra);
        assert!(!cleanup.delete_intune);
        assert!(!cleanup.dry_run);
        assert_eq!(cleanup.fresh_window_days, 14);
    }

    #[test]
    fn debug_redacts_passwords() {
        let options = DirectoryOptions {
            ldap_server: "dc01".into(),
            port: 636,
            use_ssl: true,
            allow_invalid_certificates: false,
            base_dn: "DC=corp,DC=example".into(),
            username: Some("svc-rejoin@corp.example".into()),
            password: Some("hunter2".into()),
            filter: default_computer_filter(),
            page_size: 500,
            activity_window_days: 30,
            additional_attributes: vec![],
        };
        let rendered = format!("{options:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }
}
