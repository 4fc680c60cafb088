//! Graph client configuration.

use secrecy::SecretString;

use crate::error::{GraphError, GraphResult};

const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";

/// Configuration for the Microsoft Graph clients.
#[derive(Clone)]
pub struct GraphConfig {
    /// Tenant identifier used for token acquisition.
    pub tenant_id: String,

    /// Application (client) identifier.
    pub client_id: String,

    /// Client secret for the client-credentials flow.
    pub client_secret: SecretString,

    /// Timeout applied to Graph requests, in seconds.
    pub request_timeout_secs: u64,

    /// Graph API base URL including the API version segment.
    pub base_url: String,

    /// Login authority base URL.
    pub login_url: String,
}

impl GraphConfig {
    /// Create a config for the public cloud with a 60 second timeout.
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret,
            request_timeout_secs: 60,
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }

    /// Override the Graph API base URL (sovereign clouds, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the login authority base URL.
    #[must_use]
    pub fn with_login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = login_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Validate required fields.
    pub fn validate(&self) -> GraphResult<()> {
        if self.tenant_id.trim().is_empty() {
            return Err(GraphError::Config("tenant_id must not be empty".into()));
        }
        if self.client_id.trim().is_empty() {
            return Err(GraphError::Config("client_id must not be empty".into()));
        }
        Ok(())
    }

    /// The `OAuth2` scope for the configured Graph endpoint, e.g.
    /// `https://graph.microsoft.com/.default`.
    #[must_use]
    pub fn scope(&self) -> String {
        format!("{}/.default", origin_of(&self.base_url))
    }

    /// The token endpoint for the configured tenant.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.login_url, self.tenant_id)
    }
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***REDACTED***")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("base_url", &self.base_url)
            .field("login_url", &self.login_url)
            .finish()
    }
}

/// Strip the path from a URL, keeping `scheme://host[:port]`.
fn origin_of(url: &str) -> &str {
    match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            match rest.find('/') {
                Some(path_start) => &url[..scheme_end + 3 + path_start],
                None => url,
            }
        }
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GraphConfig {
        GraphConfig::new(
            "tenant-id",
            "client-id",
            SecretString::from("secret".to_string()),
        )
    }

    #[test]
    fn default_scope_targets_public_cloud() {
        assert_eq!(config().scope(), "https://graph.microsoft.com/.default");
    }

    #[test]
    fn scope_follows_base_url_override() {
        let config = config().with_base_url("https://graph.example.test/v1.0/");
        assert_eq!(config.base_url, "https://graph.example.test/v1.0");
        assert_eq!(config.scope(), "https://graph.example.test/.default");
    }

    #[test]
    fn token_url_includes_tenant() {
        assert_eq!(
            config().token_url(),
            "https://login.microsoftonline.com/tenant-id/oauth2/v2.0/token"
        );
    }

    #[test]
    fn validate_rejects_blank_tenant() {
        let mut config = config();
        config.tenant_id = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("secret\""));
        assert!(rendered.contains("REDACTED"));
    }
}
