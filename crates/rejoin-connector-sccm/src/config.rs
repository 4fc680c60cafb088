//! SCCM AdminService client configuration.

use secrecy::SecretString;

use rejoin_connector::error::{ConnectorError, ConnectorResult};

/// Configuration for the AdminService client.
#[derive(Clone)]
pub struct SccmConfig {
    /// Base URL of the site server, e.g. `https://cm01.corp.example`.
    pub base_url: String,

    /// Optional service account user.
    pub username: Option<String>,

    /// Optional service account password.
    pub password: Option<SecretString>,

    /// Bypass certificate validation for self-signed site servers.
    pub allow_invalid_certificates: bool,
}

impl SccmConfig {
    /// Create a config for the given site server base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: None,
            password: None,
            allow_invalid_certificates: false,
        }
    }

    /// Set service account credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password);
        self
    }

    /// Bypass certificate validation. Diagnostics only.
    #[must_use]
    pub fn with_invalid_certificates_allowed(mut self) -> Self {
        self.allow_invalid_certificates = true;
        self
    }

    /// Validate required fields.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "AdminService base URL not configured",
            ));
        }
        Ok(())
    }

    /// Root of the versioned AdminService API.
    #[must_use]
    pub fn service_root(&self) -> String {
        format!("{}/AdminService/v1.0", self.base_url)
    }
}

impl std::fmt::Debug for SccmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SccmConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***REDACTED***"))
            .field("allow_invalid_certificates", &self.allow_invalid_certificates)
            .finish()
    }
}
