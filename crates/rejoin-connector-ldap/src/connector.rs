//! LDAP directory source
//!
//! Fetches computer accounts from Active Directory with server-side paging
//! and maps them into domain records.

use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, info, instrument, warn};

use rejoin_connector::error::{ConnectorError, ConnectorResult};
use rejoin_connector::traits::{DirectorySource, Source};
use rejoin_core::models::DirectoryDevice;
use rejoin_core::options::DirectoryOptions;

use crate::mapping;

/// LDAP result code for invalid credentials.
const LDAP_INVALID_CREDENTIALS: u32 = 49;

/// Attributes requested for every computer account.
const DEFAULT_ATTRIBUTES: [&str; 9] = [
    "objectGUID",
    "sAMAccountName",
    "distinguishedName",
    "dNSHostName",
    "operatingSystem",
    "operatingSystemVersion",
    "lastLogonTimestamp",
    "whenChanged",
    "msDS-DeviceId",
];

/// Directory source backed by an LDAP connection to Active Directory.
pub struct LdapDirectorySource {
    options: DirectoryOptions,
    display_name: String,
}

impl LdapDirectorySource {
    /// Create a new LDAP directory source with the given options.
    pub fn new(options: DirectoryOptions) -> ConnectorResult<Self> {
        if options.ldap_server.trim().is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "directory ldap_server must not be empty",
            ));
        }
        if options.base_dn.trim().is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "directory base_dn must not be empty",
            ));
        }
        if options.page_size == 0 {
            return Err(ConnectorError::invalid_configuration(
                "directory page_size must be greater than zero",
            ));
        }

        let display_name = format!("LDAP: {}", options.ldap_server);

        Ok(Self {
            options,
            display_name,
        })
    }

    fn url(&self) -> String {
        let scheme = if self.options.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.options.ldap_server, self.options.port)
    }

    /// Requested attributes: defaults plus any configured extras, deduplicated
    /// case-insensitively.
    fn attributes(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for attribute in DEFAULT_ATTRIBUTES
            .iter()
            .map(|a| (*a).to_string())
            .chain(self.options.additional_attributes.iter().cloned())
        {
            if !seen.iter().any(|s| s.eq_ignore_ascii_case(&attribute)) {
                seen.push(attribute);
            }
        }
        seen
    }

    /// Open a connection and bind.
    async fn connect(&self) -> ConnectorResult<Ldap> {
        let url = self.url();
        debug!(url = %url, "Connecting to directory");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(std::time::Duration::from_secs(30))
            .set_no_tls_verify(self.options.allow_invalid_certificates);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                ConnectorError::connection_failed_with_source(
                    format!("failed to connect to directory at {url}"),
                    e,
                )
            })?;

        // Spawn the connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        if let (Some(username), Some(password)) =
            (&self.options.username, &self.options.password)
        {
            debug!(bind_dn = %username, "Performing LDAP bind");

            let result = ldap.simple_bind(username, password).await.map_err(|e| {
                ConnectorError::connection_failed_with_source(
                    format!("LDAP bind failed for {username}"),
                    e,
                )
            })?;

            if result.rc == LDAP_INVALID_CREDENTIALS {
                return Err(ConnectorError::AuthenticationFailed);
            }
            if result.rc != 0 {
                return Err(ConnectorError::connection_failed(format!(
                    "LDAP bind failed with code {}: {}",
                    result.rc, result.text
                )));
            }
        }

        Ok(ldap)
    }
}

#[async_trait]
impl Source for LdapDirectorySource {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self))]
    async fn test_connection(&self) -> ConnectorResult<()> {
        let mut ldap = self.connect().await?;

        let result = ldap
            .search(
                &self.options.base_dn,
                Scope::Base,
                "(objectClass=*)",
                vec!["dn"],
            )
            .await
            .map_err(|e| ConnectorError::connection_failed_with_source("test search failed", e))?;

        let (entries, _res) = result.success().map_err(|e| {
            ConnectorError::connection_failed(format!("test search failed: {e:?}"))
        })?;

        if entries.is_empty() {
            return Err(ConnectorError::connection_failed(format!(
                "base DN '{}' not found or not accessible",
                self.options.base_dn
            )));
        }

        let _ = ldap.unbind().await;

        info!("Directory connection test successful");
        Ok(())
    }
}

#[async_trait]
impl DirectorySource for LdapDirectorySource {
    #[instrument(skip(self), fields(server = %self.options.ldap_server))]
    async fn fetch_computers(&self) -> ConnectorResult<Vec<DirectoryDevice>> {
        let mut ldap = self.connect().await?;

        let attributes = self.attributes();
        let attribute_refs: Vec<&str> = attributes.iter().map(String::as_str).collect();

        debug!(
            base_dn = %self.options.base_dn,
            filter = %self.options.filter,
            page_size = self.options.page_size,
            "Querying directory for computer accounts"
        );

        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(self.options.page_size as i32)),
        ];

        let mut search = ldap
            .streaming_search_with(
                adapters,
                &self.options.base_dn,
                Scope::Subtree,
                &self.options.filter,
                attribute_refs,
            )
            .await
            .map_err(|e| {
                ConnectorError::operation_failed_with_source("directory search failed", e)
            })?;

        let mut devices = Vec::new();
        let mut dropped = 0usize;

        while let Some(raw) = search.next().await.map_err(|e| {
            ConnectorError::operation_failed_with_source("directory search page failed", e)
        })? {
            let entry = SearchEntry::construct(raw);
            match mapping::map_entry(&entry) {
                Some(device) => devices.push(device),
                None => {
                    dropped += 1;
                    warn!(dn = %entry.dn, "Failed to map directory entry, dropping");
                }
            }
        }

        search.finish().await.success().map_err(|e| {
            ConnectorError::operation_failed(format!("directory search did not complete: {e:?}"))
        })?;

        let _ = ldap.unbind().await;

        info!(
            fetched = devices.len(),
            dropped, "Fetched computer accounts from directory"
        );

        Ok(devices)
    }
}

impl std::fmt::Debug for LdapDirectorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectorySource")
            .field("display_name", &self.display_name)
            .field("options", &self.options)
            .finish()
    }
}
