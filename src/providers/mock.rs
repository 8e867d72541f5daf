//! Mock providers for testing.
//!
//! Complete in-memory implementations of the four pipeline seams, with
//! error injection to simulate failure conditions without a control plane
//! or a database server.

use crate::config::Config;
use crate::connect::{ConnectionDescriptor, Connector};
use crate::credential::{CredentialBroker, DatabaseCredential};
use crate::metadata::{InstanceDescriptor, MetadataResolver};
use crate::secret::SecretString;
use crate::token::{BearerToken, IdentityTokenProvider};
use crate::validation::validate_instance_name;
use crate::{PgleaseError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::RwLock;
use uuid::Uuid;

fn injected(err: &PgleaseError) -> PgleaseError {
    // PgleaseError is not Clone; re-wrap the injected error's message.
    PgleaseError::Other(anyhow::anyhow!("{}", err))
}

/// Mock identity token provider.
///
/// Issues tokens with a configurable lifetime; negative lifetimes produce
/// already-expired tokens for testing the expiry invariant.
pub struct MockTokenProvider {
    lifetime_secs: i64,
    /// Error to return from `acquire_token()`
    pub auth_error: Option<PgleaseError>,
    calls: AtomicU64,
}

impl MockTokenProvider {
    /// Creates a provider issuing one-hour tokens.
    pub fn new() -> Self {
        Self {
            lifetime_secs: 3600,
            auth_error: None,
            calls: AtomicU64::new(0),
        }
    }

    /// Overrides the issued token lifetime in seconds (may be negative).
    pub fn with_lifetime_secs(mut self, lifetime_secs: i64) -> Self {
        self.lifetime_secs = lifetime_secs;
        self
    }

    /// Number of acquire calls served.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityTokenProvider for MockTokenProvider {
    async fn acquire_token(&self) -> Result<BearerToken> {
        if let Some(ref err) = self.auth_error {
            return Err(injected(err));
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(BearerToken::new(
            SecretString::new(format!("mock-bearer-{}", n)),
            Utc::now() + chrono::Duration::seconds(self.lifetime_secs),
        ))
    }
}

/// Mock control plane: instance metadata plus credential minting.
///
/// # Example
///
/// ```
/// use pglease::providers::mock::MockControlPlane;
///
/// #[tokio::main]
/// async fn main() {
///     let plane = MockControlPlane::new();
///     plane.set_instance("db1", "db1.example.internal").await;
///     assert_eq!(plane.mint_count(), 0);
/// }
/// ```
pub struct MockControlPlane {
    instances: RwLock<HashMap<String, InstanceDescriptor>>,
    /// Error to return from `resolve_instance()`
    pub resolve_error: Option<PgleaseError>,
    /// Error to return from `mint_credential()`
    pub mint_error: Option<PgleaseError>,
    /// Simulate a success response that omits the secret token field
    pub omit_token: bool,
    mint_count: AtomicU64,
    request_ids: Mutex<Vec<Uuid>>,
}

impl MockControlPlane {
    /// Creates an empty control plane.
    pub fn new() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
            resolve_error: None,
            mint_error: None,
            omit_token: false,
            mint_count: AtomicU64::new(0),
            request_ids: Mutex::new(Vec::new()),
        }
    }

    /// Registers an instance with the default port.
    pub async fn set_instance(&self, name: impl Into<String>, endpoint: impl Into<String>) {
        let descriptor = InstanceDescriptor::new(name, endpoint);
        let mut instances = self.instances.write().await;
        instances.insert(descriptor.name.clone(), descriptor);
    }

    /// Number of credentials minted.
    pub fn mint_count(&self) -> u64 {
        self.mint_count.load(Ordering::SeqCst)
    }

    /// Request ids observed across all mints, in order.
    pub fn minted_request_ids(&self) -> Vec<Uuid> {
        self.request_ids.lock().unwrap().clone()
    }
}

impl Default for MockControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataResolver for MockControlPlane {
    async fn resolve_instance(
        &self,
        _token: &BearerToken,
        instance_name: &str,
    ) -> Result<InstanceDescriptor> {
        validate_instance_name(instance_name)?;
        if let Some(ref err) = self.resolve_error {
            return Err(injected(err));
        }

        let instances = self.instances.read().await;
        instances
            .get(instance_name)
            .cloned()
            .ok_or_else(|| PgleaseError::InstanceNotFound(instance_name.to_string()))
    }
}

#[async_trait]
impl CredentialBroker for MockControlPlane {
    async fn mint_credential(
        &self,
        _token: &BearerToken,
        instance_names: &[String],
    ) -> Result<DatabaseCredential> {
        if instance_names.is_empty() {
            return Err(PgleaseError::InvalidInstanceName(
                "instance name set is empty".to_string(),
            ));
        }
        if let Some(ref err) = self.mint_error {
            return Err(injected(err));
        }
        if self.omit_token {
            return Err(PgleaseError::CredentialMissing(instance_names.join(", ")));
        }

        let n = self.mint_count.fetch_add(1, Ordering::SeqCst);
        let request_id = Uuid::new_v4();
        self.request_ids.lock().unwrap().push(request_id);

        Ok(DatabaseCredential {
            request_id,
            instance_names: instance_names.to_vec(),
            token: SecretString::new(format!("mock-pg-token-{}", n)),
            expires_at: None,
        })
    }
}

/// Mock connector.
///
/// Accepts any password by default; set `accepted_password` to simulate a
/// server that rejects everything else (e.g. a rotated credential), or
/// `refuse` to simulate an unreachable endpoint.
pub struct MockConnector {
    /// When set, only this password is accepted
    pub accepted_password: Option<String>,
    /// Simulate a network-level failure
    pub refuse: bool,
    server_version: String,
    attempts: AtomicU64,
}

impl MockConnector {
    /// Creates a connector that accepts any password.
    pub fn new() -> Self {
        Self {
            accepted_password: None,
            refuse: false,
            server_version: "PostgreSQL 16.4 (mock)".to_string(),
            attempts: AtomicU64::new(0),
        }
    }

    /// Number of open attempts observed.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle produced by [`MockConnector`].
pub struct MockHandle {
    /// Username the connection was opened as
    pub username: String,
    /// Database the connection was opened against
    pub database: String,
    server_version: String,
}

impl MockHandle {
    /// Version string from the simulated probe.
    pub fn server_version(&self) -> &str {
        &self.server_version
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Handle = MockHandle;

    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<MockHandle> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.refuse {
            return Err(PgleaseError::ConnectionRefused(format!(
                "{}:{} unreachable",
                descriptor.host, descriptor.port
            )));
        }

        if let Some(ref accepted) = self.accepted_password {
            if descriptor.password.expose() != accepted {
                return Err(PgleaseError::AuthenticationRejected(format!(
                    "password authentication failed for user \"{}\"",
                    descriptor.username
                )));
            }
        }

        Ok(MockHandle {
            username: descriptor.username.clone(),
            database: descriptor.database.clone(),
            server_version: self.server_version.clone(),
        })
    }
}

/// A ready-to-use config for mock-backed tests and demos.
pub fn mock_config() -> Config {
    Config::new("https://control.mock.invalid")
        .with_client_credentials("mock-client", "mock-secret")
        .with_username("app-client")
        .with_database("appdb")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn token() -> BearerToken {
        MockTokenProvider::new().acquire_token().await.unwrap()
    }

    #[tokio::test]
    async fn test_resolve_known_instance() {
        let plane = MockControlPlane::new();
        plane.set_instance("db1", "db1.example.internal").await;

        let descriptor = plane.resolve_instance(&token().await, "db1").await.unwrap();
        assert_eq!(descriptor.read_write_endpoint, "db1.example.internal");
    }

    #[tokio::test]
    async fn test_resolve_unknown_instance() {
        let plane = MockControlPlane::new();
        let result = plane.resolve_instance(&token().await, "nope").await;
        assert!(matches!(result, Err(PgleaseError::InstanceNotFound(_))));
    }

    #[tokio::test]
    async fn test_distinct_mints() {
        let plane = MockControlPlane::new();
        let names = vec!["db1".to_string()];
        let bearer = token().await;

        let first = plane.mint_credential(&bearer, &names).await.unwrap();
        let second = plane.mint_credential(&bearer, &names).await.unwrap();

        assert_ne!(first.request_id, second.request_id);
        assert_ne!(first.token.expose(), second.token.expose());
        assert_eq!(plane.mint_count(), 2);
        assert_eq!(plane.minted_request_ids().len(), 2);
    }

    #[tokio::test]
    async fn test_omitted_token_surfaces() {
        let mut plane = MockControlPlane::new();
        plane.omit_token = true;

        let result = plane
            .mint_credential(&token().await, &["db1".to_string()])
            .await;
        assert!(matches!(result, Err(PgleaseError::CredentialMissing(_))));
    }

    #[tokio::test]
    async fn test_error_injection() {
        let mut plane = MockControlPlane::new();
        plane.resolve_error = Some(PgleaseError::MetadataParse("boom".to_string()));

        let result = plane.resolve_instance(&token().await, "db1").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_connector_rejects_wrong_password() {
        let mut connector = MockConnector::new();
        connector.accepted_password = Some("right".to_string());

        let instance = InstanceDescriptor::new("db1", "db1.example.internal");
        let credential = DatabaseCredential {
            request_id: Uuid::new_v4(),
            instance_names: vec!["db1".to_string()],
            token: SecretString::new("wrong"),
            expires_at: None,
        };
        let descriptor =
            ConnectionDescriptor::new(&instance, &credential, "app-client", "appdb").unwrap();

        let result = connector.open(&descriptor).await;
        assert!(matches!(
            result,
            Err(PgleaseError::AuthenticationRejected(_))
        ));
        assert_eq!(connector.attempts(), 1);
    }
}
