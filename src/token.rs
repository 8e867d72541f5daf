//! Bearer token acquisition.
//!
//! The bearer token proves the application's identity to the control plane
//! for the duration of one bootstrap run. It is never cached across runs and
//! never persisted; each run re-authenticates.

use crate::secret::SecretString;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A short-lived bearer identity token.
///
/// Owned exclusively by the calling flow for the duration of one bootstrap
/// sequence. The token value is redacted in `Debug` output.
#[derive(Clone)]
pub struct BearerToken {
    access_token: SecretString,
    expires_at: DateTime<Utc>,
}

impl BearerToken {
    /// Wraps an acquired token with its expiry instant.
    pub fn new(access_token: SecretString, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token,
            expires_at,
        }
    }

    /// Raw token value for the `Authorization: Bearer` header.
    ///
    /// Must not be logged or persisted.
    pub fn secret(&self) -> &str {
        self.access_token.expose()
    }

    /// When the token expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once the expiry instant has passed.
    ///
    /// An expired token must not be presented to the control plane; the
    /// only recovery is re-running the flow from token acquisition.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("access_token", &self.access_token)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Exchanges long-lived application credentials for a short-lived bearer
/// token scoped to the control-plane audience.
///
/// # Implementations
///
/// - [`OAuthTokenProvider`](crate::providers::oauth::OAuthTokenProvider):
///   client-credentials exchange against an OAuth identity provider
/// - [`MockTokenProvider`](crate::providers::mock::MockTokenProvider):
///   in-memory testing provider (feature `mock`)
#[async_trait]
pub trait IdentityTokenProvider: Send + Sync {
    /// Performs the token exchange and returns the token plus its expiry.
    ///
    /// # Errors
    ///
    /// Returns [`PgleaseError::Authentication`](crate::PgleaseError::Authentication)
    /// when credentials are invalid, the tenant is unreachable, or the
    /// provider returns a non-success response. This failure is fatal to
    /// the whole flow; no retry is performed at this layer, since retrying
    /// with known-bad credentials is pointless.
    async fn acquire_token(&self) -> Result<BearerToken>;
}
