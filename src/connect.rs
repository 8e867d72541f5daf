//! Connection descriptor construction and the connector seam.

use crate::credential::DatabaseCredential;
use crate::metadata::InstanceDescriptor;
use crate::secret::SecretString;
use crate::{PgleaseError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Fully parameterized set of fields required to open a database
/// connection.
///
/// Exists only transiently, to carry the resolved endpoint and the minted
/// password into the connection open call. Encrypted transport is not
/// configurable: every connection built from a descriptor requires TLS.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    /// Endpoint hostname
    pub host: String,

    /// Wire port
    pub port: u16,

    /// Target database name
    pub database: String,

    /// Database role
    pub username: String,

    /// Minted password (never logged)
    pub password: SecretString,

    /// `application_name` reported to the server
    pub application_name: String,

    /// Session statement timeout, when set
    pub statement_timeout: Option<Duration>,
}

impl ConnectionDescriptor {
    /// Builds a descriptor from a resolved instance and a minted
    /// credential.
    ///
    /// Validates the credential/instance linkage explicitly rather than
    /// trusting caller discipline: the credential's instance set must
    /// include the descriptor's instance name.
    ///
    /// # Errors
    ///
    /// Returns [`PgleaseError::InstanceMismatch`] when the credential was
    /// minted for a different instance set.
    pub fn new(
        instance: &InstanceDescriptor,
        credential: &DatabaseCredential,
        username: impl Into<String>,
        database: impl Into<String>,
    ) -> Result<Self> {
        if !credential.covers(&instance.name) {
            return Err(PgleaseError::InstanceMismatch {
                instance: instance.name.clone(),
                granted: credential.instance_names.join(", "),
            });
        }

        Ok(Self {
            host: instance.read_write_endpoint.clone(),
            port: instance.port,
            database: database.into(),
            username: username.into(),
            password: credential.token.clone(),
            application_name: "pglease".to_string(),
            statement_timeout: None,
        })
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
}

impl std::fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password)
            .field("application_name", &self.application_name)
            .finish()
    }
}

/// Opens an authenticated connection from a descriptor.
///
/// The associated `Handle` owns the live network resource; the caller owns
/// its lifetime and must release it on all exit paths.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Live connection handle type.
    type Handle: Send;

    /// Opens the connection, optionally verifying the credential with a
    /// lightweight probe before returning.
    ///
    /// # Errors
    ///
    /// - [`PgleaseError::ConnectionRefused`](crate::PgleaseError::ConnectionRefused):
    ///   network-level failure
    /// - [`PgleaseError::AuthenticationRejected`](crate::PgleaseError::AuthenticationRejected):
    ///   server rejected the password, commonly an expired or rotated
    ///   credential; re-run the whole flow rather than retrying the
    ///   connection alone
    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Self::Handle>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn fixtures() -> (InstanceDescriptor, DatabaseCredential) {
        let instance = InstanceDescriptor::new("db1", "db1.example.internal");
        let credential = DatabaseCredential {
            request_id: Uuid::new_v4(),
            instance_names: vec!["db1".to_string()],
            token: SecretString::new("pg-secret"),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(300)),
        };
        (instance, credential)
    }

    #[test]
    fn test_descriptor_from_matching_credential() {
        let (instance, credential) = fixtures();
        let descriptor =
            ConnectionDescriptor::new(&instance, &credential, "app-client", "appdb").unwrap();

        assert_eq!(descriptor.host, "db1.example.internal");
        assert_eq!(descriptor.port, 5432);
        assert_eq!(descriptor.username, "app-client");
        assert_eq!(descriptor.database, "appdb");
        assert_eq!(descriptor.password.expose(), "pg-secret");
    }

    #[test]
    fn test_mismatched_credential_rejected() {
        let (mut instance, credential) = fixtures();
        instance.name = "db2".to_string();

        let result = ConnectionDescriptor::new(&instance, &credential, "app-client", "appdb");
        assert!(matches!(
            result,
            Err(PgleaseError::InstanceMismatch { .. })
        ));
    }

    #[test]
    fn test_debug_omits_password() {
        let (instance, credential) = fixtures();
        let descriptor =
            ConnectionDescriptor::new(&instance, &credential, "app-client", "appdb").unwrap();
        let rendered = format!("{:?}", descriptor);
        assert!(!rendered.contains("pg-secret"));
    }
}
