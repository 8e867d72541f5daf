//! Postgres connector built on sqlx.

use crate::config::Config;
use crate::connect::{ConnectionDescriptor, Connector};
use crate::error::Stage;
use crate::{PgleaseError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{Connection, PgConnection};
use std::time::Duration;

/// Opens TLS-required Postgres connections from a [`ConnectionDescriptor`].
pub struct PgConnector {
    connect_timeout: Duration,
    verify: bool,
}

impl PgConnector {
    /// Creates a connector from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            connect_timeout: config.request_timeout,
            verify: config.verify_connection,
        }
    }
}

impl Default for PgConnector {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            verify: true,
        }
    }
}

/// A live, authenticated Postgres connection.
///
/// The caller owns the lifetime: call [`close`](PgHandle::close) for a
/// clean shutdown, or drop the handle to tear the connection down.
pub struct PgHandle {
    conn: PgConnection,
    server_version: Option<String>,
}

impl PgHandle {
    /// Server version string captured by the post-connect probe, when
    /// verification was enabled.
    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    /// Round-trips to the server to confirm the connection is still alive.
    pub async fn ping(&mut self) -> Result<()> {
        self.conn.ping().await.map_err(classify_connect_error)
    }

    /// Runs the version probe on demand.
    pub async fn version(&mut self) -> Result<String> {
        let version: String = sqlx::query_scalar("SELECT version()")
            .fetch_one(&mut self.conn)
            .await
            .map_err(classify_connect_error)?;
        Ok(version)
    }

    /// Cleanly closes the connection.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await.map_err(classify_connect_error)
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Handle = PgHandle;

    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<PgHandle> {
        let mut options = PgConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .database(&descriptor.database)
            .username(&descriptor.username)
            .password(descriptor.password.expose())
            .ssl_mode(PgSslMode::Require)
            .application_name(&descriptor.application_name);

        if let Some(timeout) = descriptor.statement_timeout {
            options = options.options([(
                "statement_timeout",
                format!("{}", timeout.as_millis()),
            )]);
        }

        tracing::info!(
            host = %descriptor.host,
            port = descriptor.port,
            database = %descriptor.database,
            username = %descriptor.username,
            "opening database connection"
        );

        let conn = tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&options))
            .await
            .map_err(|_| PgleaseError::DeadlineExceeded {
                stage: Stage::Connect,
            })?
            .map_err(classify_connect_error)?;

        let mut handle = PgHandle {
            conn,
            server_version: None,
        };

        if self.verify {
            let version = handle.version().await?;
            tracing::debug!(server_version = %version, "credential accepted by server");
            handle.server_version = Some(version);
        }

        Ok(handle)
    }
}

/// SQLSTATE codes the server uses to reject a password.
///
/// 28P01 is `invalid_password`; 28000 is `invalid_authorization_specification`.
/// Both mean the minted credential was not accepted, commonly because it
/// expired or was already rotated.
fn is_auth_rejection(code: Option<&str>) -> bool {
    matches!(code, Some("28P01") | Some("28000"))
}

/// Maps a driver error onto the bootstrap taxonomy.
///
/// Password rejection becomes [`PgleaseError::AuthenticationRejected`], the
/// signal to re-run the whole flow from token acquisition. Network-level
/// failures become [`PgleaseError::ConnectionRefused`]. Everything else
/// passes through as a database error.
fn classify_connect_error(err: sqlx::Error) -> PgleaseError {
    match err {
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned());
            if is_auth_rejection(code.as_deref()) {
                PgleaseError::AuthenticationRejected(db.message().to_string())
            } else {
                PgleaseError::Database(sqlx::Error::Database(db))
            }
        }
        e @ (sqlx::Error::Io(_) | sqlx::Error::Tls(_)) => {
            PgleaseError::ConnectionRefused(e.to_string())
        }
        e => PgleaseError::Database(e),
    }
}
