//! End-to-end bootstrap orchestration.
//!
//! The flow is strictly sequential: token, then endpoint and credential,
//! then connection. Each step's output is a hard input dependency for the
//! next, so there is no parallelism opportunity within one run, and nothing
//! is shared across runs. Cancellation is all-or-nothing: on any failure or
//! deadline expiry the only recovery is re-running from the top, since the
//! bearer token and database credential are both short-lived and cannot be
//! safely reused across an aborted attempt.

use crate::config::Config;
use crate::connect::{ConnectionDescriptor, Connector};
use crate::credential::CredentialBroker;
use crate::error::Stage;
use crate::metadata::MetadataResolver;
use crate::token::{BearerToken, IdentityTokenProvider};
use crate::validation::validate_instance_name;
use crate::{PgleaseError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Runs the four-stage bootstrap pipeline and hands back a live connection
/// handle.
///
/// # Example
///
/// ```no_run
/// use pglease::providers::control_plane::ControlPlaneClient;
/// use pglease::providers::oauth::OAuthTokenProvider;
/// use pglease::providers::postgres::PgConnector;
/// use pglease::{Bootstrapper, Config};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> pglease::Result<()> {
///     let config = Config::from_env()?;
///
///     let tokens = Arc::new(OAuthTokenProvider::new(&config)?);
///     let plane = Arc::new(ControlPlaneClient::new(&config)?);
///     let connector = PgConnector::new(&config);
///
///     let flow = Bootstrapper::new(tokens, plane.clone(), plane, connector, &config);
///     let handle = flow.run("prod-db-1").await?;
///
///     println!("connected: {:?}", handle.server_version());
///     handle.close().await?;
///     Ok(())
/// }
/// ```
pub struct Bootstrapper<C: Connector> {
    tokens: Arc<dyn IdentityTokenProvider>,
    resolver: Arc<dyn MetadataResolver>,
    broker: Arc<dyn CredentialBroker>,
    connector: C,
    username: String,
    database: String,
    application_name: String,
    statement_timeout: Option<Duration>,
    flow_deadline: Duration,
}

impl<C: Connector> Bootstrapper<C> {
    /// Assembles a flow from its four stage providers and configuration.
    pub fn new(
        tokens: Arc<dyn IdentityTokenProvider>,
        resolver: Arc<dyn MetadataResolver>,
        broker: Arc<dyn CredentialBroker>,
        connector: C,
        config: &Config,
    ) -> Self {
        Self {
            tokens,
            resolver,
            broker,
            connector,
            username: config.username.clone(),
            database: config.database.clone(),
            application_name: config.application_name.clone(),
            statement_timeout: config.statement_timeout,
            flow_deadline: config.flow_deadline,
        }
    }

    /// The connector in use (handy for inspecting mocks in tests).
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Runs the whole pipeline for one instance, bounded by the flow
    /// deadline.
    ///
    /// Either produces a usable, open connection or terminates with a
    /// stage-labeled error; it never returns a connection built from
    /// partially-failed steps.
    ///
    /// # Errors
    ///
    /// Any stage error propagates unchanged (see [`PgleaseError::stage`]).
    /// Deadline expiry yields
    /// [`PgleaseError::DeadlineExceeded`] with [`Stage::Flow`].
    pub async fn run(&self, instance_name: &str) -> Result<C::Handle> {
        match tokio::time::timeout(self.flow_deadline, self.run_inner(instance_name)).await {
            Ok(result) => result,
            Err(_) => Err(PgleaseError::DeadlineExceeded { stage: Stage::Flow }),
        }
    }

    async fn run_inner(&self, instance_name: &str) -> Result<C::Handle> {
        validate_instance_name(instance_name)?;

        let token = self.tokens.acquire_token().await?;
        ensure_live(&token)?;
        tracing::info!(stage = %Stage::Token, expires_at = %token.expires_at(), "bearer token acquired");

        let instance = self.resolver.resolve_instance(&token, instance_name).await?;
        tracing::info!(
            stage = %Stage::Metadata,
            instance = %instance.name,
            endpoint = %instance.read_write_endpoint,
            port = instance.port,
            "instance endpoint resolved"
        );

        ensure_live(&token)?;
        let names = vec![instance_name.to_string()];
        let credential = self.broker.mint_credential(&token, &names).await?;
        tracing::info!(
            stage = %Stage::Credential,
            request_id = %credential.request_id,
            "database credential minted"
        );

        let mut descriptor =
            ConnectionDescriptor::new(&instance, &credential, &self.username, &self.database)?
                .with_application_name(&self.application_name);
        if let Some(timeout) = self.statement_timeout {
            descriptor = descriptor.with_statement_timeout(timeout);
        }

        let handle = self.connector.open(&descriptor).await?;
        tracing::info!(stage = %Stage::Connect, "connection established");
        Ok(handle)
    }

    /// Non-fatal pre-flight probe: can the configured identity resolve
    /// this instance, and does it have a populated read-write endpoint?
    pub async fn validate_instance_access(&self, instance_name: &str) -> bool {
        let token = match self.tokens.acquire_token().await {
            Ok(token) => token,
            Err(err) => {
                tracing::debug!(error = %err, "access validation failed at token acquisition");
                return false;
            }
        };

        match self.resolver.resolve_instance(&token, instance_name).await {
            Ok(instance) => !instance.read_write_endpoint.is_empty(),
            Err(err) => {
                tracing::debug!(error = %err, "access validation failed at metadata lookup");
                false
            }
        }
    }
}

/// An expired bearer token must never reach the control plane.
fn ensure_live(token: &BearerToken) -> Result<()> {
    if token.is_expired() {
        return Err(PgleaseError::Authentication(
            "bearer token expired mid-flow; re-run from token acquisition".to_string(),
        ));
    }
    Ok(())
}
