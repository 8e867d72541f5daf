//! Pglease - short-lived Postgres credential leasing and connection
//! bootstrap.
//!
//! Pglease takes an application from long-lived client credentials to a
//! live, TLS-protected Postgres connection in one strictly ordered flow:
//! exchange the client credentials for a short-lived bearer token, resolve
//! the target instance's read-write endpoint from the control plane, mint a
//! fresh time-limited database password, and open (and verify) the
//! connection. Getting the ordering, failure modes, and credential lifetime
//! right is the whole point: done wrong, the caller silently fails to
//! connect or leaks a stale password.
//!
//! # Features
//!
//! - **Trait seams per stage**: swap any stage for a test double
//! - **Async/Await**: built on tokio for non-blocking I/O
//! - **Secrets stay secret**: redacted `Debug`, zeroized buffers, no
//!   secret ever logged
//! - **Stage-labeled errors**: every failure names the stage that died, so
//!   callers know whether re-running the flow can help
//! - **Deadlines**: per-request timeouts plus an overall flow deadline
//!
//! # Quick Start
//!
//! ```no_run
//! use pglease::providers::control_plane::ControlPlaneClient;
//! use pglease::providers::oauth::OAuthTokenProvider;
//! use pglease::providers::postgres::PgConnector;
//! use pglease::{Bootstrapper, Config};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> pglease::Result<()> {
//!     let config = Config::new("https://control.example.com")
//!         .with_identity("https://login.example.com", "tenant-a")
//!         .with_client_credentials("app-client-id", std::env::var("APP_CLIENT_SECRET").unwrap())
//!         .with_username("app-client")
//!         .with_database("appdb");
//!
//!     let tokens = Arc::new(OAuthTokenProvider::new(&config)?);
//!     let plane = Arc::new(ControlPlaneClient::new(&config)?);
//!     let connector = PgConnector::new(&config);
//!
//!     let flow = Bootstrapper::new(tokens, plane.clone(), plane, connector, &config);
//!
//!     let handle = flow.run("prod-db-1").await?;
//!     println!("server: {:?}", handle.server_version());
//!     handle.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! | Stage | Trait | Default provider |
//! |-------|-------|------------------|
//! | Token acquisition | [`IdentityTokenProvider`] | [`providers::oauth::OAuthTokenProvider`] |
//! | Instance metadata | [`MetadataResolver`] | [`providers::control_plane::ControlPlaneClient`] |
//! | Credential mint | [`CredentialBroker`] | [`providers::control_plane::ControlPlaneClient`] |
//! | Connection open | [`Connector`] | [`providers::postgres::PgConnector`] |
//!
//! Data flows strictly left to right: token, then endpoint and credential,
//! then connection. Nothing is cached across runs; every run
//! re-authenticates.
//!
//! # Failure model
//!
//! Every error is terminal to the current attempt and labeled with its
//! stage ([`PgleaseError::stage`]). The single most important signal is
//! [`PgleaseError::AuthenticationRejected`]: the server refused the minted
//! password (expired or rotated), and the correct response is to re-run the
//! whole flow from token acquisition, never to retry the connection with
//! the same credential.

pub mod config;
pub mod connect;
pub mod credential;
pub mod error;
pub mod flow;
pub mod installer;
pub mod metadata;
pub mod providers;
pub mod retry;
pub mod secret;
pub mod token;
pub mod validation;

pub use config::Config;
pub use connect::{ConnectionDescriptor, Connector};
pub use credential::{CredentialBroker, DatabaseCredential};
pub use error::{PgleaseError, Result, Stage};
pub use flow::Bootstrapper;
pub use installer::{InstallOutcome, Installer};
pub use metadata::{InstanceDescriptor, MetadataResolver};
pub use retry::RetryPolicy;
pub use secret::SecretString;
pub use token::{BearerToken, IdentityTokenProvider};
