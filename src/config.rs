//! Configuration for the bootstrap flow.

use crate::secret::SecretString;
use crate::{PgleaseError, Result};
use std::time::Duration;

/// Configuration for one bootstrap flow.
///
/// Replaces ambient tenant/client/secret globals with an explicit value
/// passed into the providers; there are no process-wide singletons. Secrets
/// arrive through [`SecretString`] and are redacted in the `Debug` output.
///
/// Use the builder pattern for ergonomic configuration:
///
/// ```
/// use pglease::Config;
/// use std::time::Duration;
///
/// let config = Config::new("https://control.example.com")
///     .with_identity("https://login.example.com", "tenant-a")
///     .with_client_credentials("app-client-id", "app-client-secret")
///     .with_username("app-client")
///     .with_database("appdb")
///     .with_flow_deadline(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Control-plane base URL (instance metadata and credential minting)
    pub workspace_url: String,

    /// Identity provider base URL; defaults to the workspace URL
    pub identity_url: Option<String>,

    /// Tenant identifier, interpolated into the token endpoint path
    pub tenant_id: String,

    /// OAuth client id for the client-credentials exchange
    pub client_id: String,

    /// OAuth client secret (never logged)
    pub client_secret: SecretString,

    /// OAuth scope naming the control-plane audience
    pub scope: String,

    /// Database role to connect as
    pub username: String,

    /// Target database name
    pub database: String,

    /// Per-request timeout for identity and control-plane calls
    pub request_timeout: Duration,

    /// Overall deadline for one bootstrap run
    pub flow_deadline: Duration,

    /// `application_name` reported to the Postgres server
    pub application_name: String,

    /// Session statement timeout, when set
    pub statement_timeout: Option<Duration>,

    /// Run a version probe after connecting to confirm the credential
    /// was accepted
    pub verify_connection: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_url: String::new(),
            identity_url: None,
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: SecretString::new(""),
            scope: "all-apis".to_string(),
            username: String::new(),
            database: "postgres".to_string(),
            request_timeout: Duration::from_secs(30),
            flow_deadline: Duration::from_secs(120),
            application_name: "pglease".to_string(),
            statement_timeout: Some(Duration::from_secs(30)),
            verify_connection: true,
        }
    }
}

impl Config {
    /// Creates a configuration targeting the given control-plane base URL.
    pub fn new(workspace_url: impl Into<String>) -> Self {
        Self {
            workspace_url: workspace_url.into(),
            ..Default::default()
        }
    }

    /// Sets the identity provider base URL and tenant id.
    ///
    /// When not set, the token endpoint is derived from the workspace URL
    /// (control planes that issue their own tokens).
    pub fn with_identity(mut self, identity_url: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        self.identity_url = Some(identity_url.into());
        self.tenant_id = tenant_id.into();
        self
    }

    /// Sets the OAuth client id and secret.
    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<SecretString>,
    ) -> Self {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self
    }

    /// Sets the OAuth scope (default: `all-apis`).
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the database role to connect as.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Sets the target database name (default: `postgres`).
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Sets the per-request timeout for identity and control-plane calls.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the overall deadline for one bootstrap run.
    pub fn with_flow_deadline(mut self, deadline: Duration) -> Self {
        self.flow_deadline = deadline;
        self
    }

    /// Sets the `application_name` reported to the server.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Sets the session statement timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    /// Disables the post-connect version probe.
    pub fn without_verification(mut self) -> Self {
        self.verify_connection = false;
        self
    }

    /// Full URL of the client-credentials token endpoint.
    ///
    /// Built from the identity URL (or the workspace URL when no separate
    /// identity provider is configured), with the tenant id in the path
    /// when one is set.
    pub fn token_endpoint(&self) -> String {
        let base = self
            .identity_url
            .as_deref()
            .unwrap_or(&self.workspace_url)
            .trim_end_matches('/');

        if self.tenant_id.is_empty() {
            format!("{}/oauth2/v2.0/token", base)
        } else {
            format!("{}/{}/oauth2/v2.0/token", base, self.tenant_id)
        }
    }

    /// Loads configuration from `PGLEASE_*` environment variables.
    ///
    /// Required: `PGLEASE_WORKSPACE_URL`, `PGLEASE_CLIENT_ID`,
    /// `PGLEASE_CLIENT_SECRET`, `PGLEASE_USERNAME`. Optional:
    /// `PGLEASE_IDENTITY_URL`, `PGLEASE_TENANT_ID`, `PGLEASE_SCOPE`,
    /// `PGLEASE_DATABASE`.
    pub fn from_env() -> Result<Self> {
        fn required(key: &str) -> Result<String> {
            std::env::var(key)
                .map_err(|_| PgleaseError::Other(anyhow::anyhow!("{} is required", key)))
        }

        let mut config = Config::new(required("PGLEASE_WORKSPACE_URL")?)
            .with_client_credentials(
                required("PGLEASE_CLIENT_ID")?,
                required("PGLEASE_CLIENT_SECRET")?,
            )
            .with_username(required("PGLEASE_USERNAME")?);

        if let Ok(identity_url) = std::env::var("PGLEASE_IDENTITY_URL") {
            let tenant = std::env::var("PGLEASE_TENANT_ID").unwrap_or_default();
            config = config.with_identity(identity_url, tenant);
        }
        if let Ok(scope) = std::env::var("PGLEASE_SCOPE") {
            config = config.with_scope(scope);
        }
        if let Ok(database) = std::env::var("PGLEASE_DATABASE") {
            config = config.with_database(database);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = Config::new("https://control.example.com")
            .with_client_credentials("cid", "csecret")
            .with_username("app-client")
            .with_database("appdb")
            .with_request_timeout(Duration::from_secs(5));

        assert_eq!(config.workspace_url, "https://control.example.com");
        assert_eq!(config.client_id, "cid");
        assert_eq!(config.client_secret.expose(), "csecret");
        assert_eq!(config.database, "appdb");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.verify_connection);
    }

    #[test]
    fn test_token_endpoint_with_tenant() {
        let config = Config::new("https://control.example.com")
            .with_identity("https://login.example.com/", "tenant-a");
        assert_eq!(
            config.token_endpoint(),
            "https://login.example.com/tenant-a/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_token_endpoint_defaults_to_workspace() {
        let config = Config::new("https://control.example.com");
        assert_eq!(
            config.token_endpoint(),
            "https://control.example.com/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scope, "all-apis");
        assert_eq!(config.database, "postgres");
        assert_eq!(config.flow_deadline, Duration::from_secs(120));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config::new("https://control.example.com")
            .with_client_credentials("cid", "super-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
    }
}
