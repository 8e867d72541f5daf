//! Database credential minting.

use crate::secret::SecretString;
use crate::token::BearerToken;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A freshly minted, short-lived database password scoped to one or more
/// instances.
///
/// Conceptually single-use: the secret parameterizes the current connection
/// attempt and must never be persisted to disk or logs, or reused after the
/// server rotates it. When the control plane omits an expiry, the credential
/// is treated as valid only for the current attempt and a rejected password
/// at connect time is the rotation signal.
#[derive(Clone)]
pub struct DatabaseCredential {
    /// Caller-generated idempotency/tracing key for the mint request
    pub request_id: Uuid,

    /// Instance names the credential is valid for
    pub instance_names: Vec<String>,

    /// The minted password (never logged)
    pub token: SecretString,

    /// Expiry instant, when the control plane returns one
    pub expires_at: Option<DateTime<Utc>>,
}

impl DatabaseCredential {
    /// True when the credential was minted for the given instance.
    pub fn covers(&self, instance_name: &str) -> bool {
        self.instance_names.iter().any(|n| n == instance_name)
    }

    /// True once a known expiry instant has passed.
    ///
    /// Returns `false` when no expiry was returned; in that case the server
    /// enforces rotation and rejection at connect time is the signal.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expiry) => Utc::now() >= expiry,
            None => false,
        }
    }
}

impl std::fmt::Debug for DatabaseCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseCredential")
            .field("request_id", &self.request_id)
            .field("instance_names", &self.instance_names)
            .field("token", &self.token)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mints short-lived database credentials from the control plane.
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    /// Requests a fresh credential valid for the given instance names.
    ///
    /// Implementations generate a fresh v4 request id per mint attempt and
    /// submit it with the instance set. The same request id is never reused
    /// across distinct mint attempts.
    ///
    /// No retry is performed here: minting mutates server-side state and is
    /// only idempotent under request-id reuse. Callers adding retries MUST
    /// reuse the original request id to preserve at-most-one-mint semantics.
    ///
    /// # Errors
    ///
    /// - [`PgleaseError::CredentialGeneration`](crate::PgleaseError::CredentialGeneration):
    ///   any non-success response
    /// - [`PgleaseError::CredentialMissing`](crate::PgleaseError::CredentialMissing):
    ///   success response that omits the secret token field
    /// - [`PgleaseError::InvalidInstanceName`](crate::PgleaseError::InvalidInstanceName):
    ///   empty instance set or a malformed name
    async fn mint_credential(
        &self,
        token: &BearerToken,
        instance_names: &[String],
    ) -> Result<DatabaseCredential>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn credential(names: &[&str], expires_at: Option<DateTime<Utc>>) -> DatabaseCredential {
        DatabaseCredential {
            request_id: Uuid::new_v4(),
            instance_names: names.iter().map(|n| n.to_string()).collect(),
            token: SecretString::new("pg-secret"),
            expires_at,
        }
    }

    #[test]
    fn test_covers() {
        let cred = credential(&["db1", "db2"], None);
        assert!(cred.covers("db1"));
        assert!(cred.covers("db2"));
        assert!(!cred.covers("db3"));
    }

    #[test]
    fn test_expiry_absent_means_not_expired() {
        assert!(!credential(&["db1"], None).is_expired());
    }

    #[test]
    fn test_expiry_in_past() {
        let cred = credential(&["db1"], Some(Utc::now() - Duration::seconds(1)));
        assert!(cred.is_expired());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let cred = credential(&["db1"], None);
        let rendered = format!("{:?}", cred);
        assert!(!rendered.contains("pg-secret"));
        assert!(rendered.contains("db1"));
    }
}
