//! Instance metadata resolution.

use crate::token::BearerToken;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default Postgres wire port when the control plane omits one.
pub const DEFAULT_PORT: u16 = 5432;

/// Resolved network location for a named database instance.
///
/// Fetched fresh on every run and treated as immutable for the run's
/// duration. There is deliberately no cross-run cache: endpoints can move
/// between runs and a stale endpoint fails in confusing ways.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDescriptor {
    /// Instance name as known to the control plane
    pub name: String,

    /// Hostname of the read-write endpoint
    pub read_write_endpoint: String,

    /// Wire port (default 5432)
    pub port: u16,
}

impl InstanceDescriptor {
    /// Creates a descriptor with the default port.
    pub fn new(name: impl Into<String>, read_write_endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            read_write_endpoint: read_write_endpoint.into(),
            port: DEFAULT_PORT,
        }
    }

    /// Overrides the wire port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Looks up a named instance's network endpoint via the control plane.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Issues an authenticated read against the instance-metadata endpoint
    /// and parses out the read-write endpoint.
    ///
    /// Idempotent and safe to call repeatedly; results are not memoized.
    ///
    /// # Errors
    ///
    /// - [`PgleaseError::InstanceNotFound`](crate::PgleaseError::InstanceNotFound):
    ///   control plane has no instance with this name
    /// - [`PgleaseError::MetadataParse`](crate::PgleaseError::MetadataParse):
    ///   response lacks the mandatory read-write endpoint field; absence is
    ///   unrecoverable, never a default-fallback case
    async fn resolve_instance(
        &self,
        token: &BearerToken,
        instance_name: &str,
    ) -> Result<InstanceDescriptor>;
}
