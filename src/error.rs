//! Error types for credential leasing and connection bootstrap.

use thiserror::Error;

/// Result type alias using [`PgleaseError`].
pub type Result<T> = std::result::Result<T, PgleaseError>;

/// Pipeline stage an error is attributed to.
///
/// Every failure is terminal to the current bootstrap attempt; the stage
/// tells the caller where the flow stopped so it can decide whether
/// re-running the whole flow is worthwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Client-credentials exchange with the identity provider.
    Token,
    /// Instance metadata lookup against the control plane.
    Metadata,
    /// Database credential minting against the control plane.
    Credential,
    /// Opening the authenticated database connection.
    Connect,
    /// The bootstrap sequence as a whole (overall deadline).
    Flow,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token => write!(f, "token acquisition"),
            Self::Metadata => write!(f, "instance metadata"),
            Self::Credential => write!(f, "credential mint"),
            Self::Connect => write!(f, "connection"),
            Self::Flow => write!(f, "bootstrap flow"),
        }
    }
}

/// Errors that can occur during a bootstrap attempt.
///
/// None of these is recovered locally: minting a new credential after a
/// stale one is rejected requires restarting from token acquisition, since
/// the token itself may also have expired. Error text never contains secret
/// material (client secrets, bearer tokens, minted passwords).
#[derive(Debug, Error)]
pub enum PgleaseError {
    /// Identity provider rejected the client credentials or was unreachable.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Control plane has no instance with this name.
    #[error("database instance not found: {0}")]
    InstanceNotFound(String),

    /// Instance metadata lacks the mandatory read-write endpoint field.
    #[error("instance metadata unusable: {0}")]
    MetadataParse(String),

    /// Control plane refused to mint a database credential.
    #[error("credential generation failed: {0}")]
    CredentialGeneration(String),

    /// Mint response succeeded but carried no secret token field.
    #[error("credential response missing secret token for instances [{0}]")]
    CredentialMissing(String),

    /// Network-level connection failure (endpoint unreachable, TLS setup).
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// Server rejected the minted password, typically because the
    /// credential expired or was rotated. Re-run the whole flow from token
    /// acquisition rather than retrying the connection alone.
    #[error("server rejected database credential: {0}")]
    AuthenticationRejected(String),

    /// Instance name failed validation before any network call.
    #[error("invalid instance name: {0}")]
    InvalidInstanceName(String),

    /// Credential was minted for a different instance set than the one
    /// being connected to.
    #[error("credential minted for [{granted}] does not cover instance {instance}")]
    InstanceMismatch {
        /// Instance the connection was being built for
        instance: String,
        /// Instance names the credential was minted for
        granted: String,
    },

    /// A stage (or the whole flow) exceeded its configured deadline.
    #[error("{stage} deadline exceeded")]
    DeadlineExceeded {
        /// Stage that was cut off
        stage: Stage,
    },

    /// Subprocess execution failed (installer only).
    #[error("command execution failed: {0}")]
    CommandFailed(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error talking to the control plane.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Database driver error not classified as refused/rejected.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PgleaseError {
    /// Returns the pipeline stage this error is attributed to, if any.
    ///
    /// Transport-level passthroughs (`Io`, `Json`, `Http`, `Database`,
    /// `Other`, `CommandFailed`) return `None` because they can surface
    /// from more than one stage.
    ///
    /// # Example
    ///
    /// ```
    /// use pglease::{PgleaseError, Stage};
    ///
    /// let err = PgleaseError::InstanceNotFound("db1".to_string());
    /// assert_eq!(err.stage(), Some(Stage::Metadata));
    /// ```
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Authentication(_) => Some(Stage::Token),
            Self::InstanceNotFound(_) | Self::MetadataParse(_) | Self::InvalidInstanceName(_) => {
                Some(Stage::Metadata)
            }
            Self::CredentialGeneration(_) | Self::CredentialMissing(_) => Some(Stage::Credential),
            Self::ConnectionRefused(_)
            | Self::AuthenticationRejected(_)
            | Self::InstanceMismatch { .. } => Some(Stage::Connect),
            Self::DeadlineExceeded { stage } => Some(*stage),
            _ => None,
        }
    }

    /// True when re-running the entire flow from token acquisition is the
    /// documented recovery path (as opposed to a caller bug or an
    /// environment problem no retry will fix).
    pub fn is_rerunnable(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationRejected(_) | Self::DeadlineExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PgleaseError::InstanceNotFound("db1".to_string());
        assert_eq!(err.to_string(), "database instance not found: db1");
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(
            PgleaseError::Authentication("bad secret".into()).stage(),
            Some(Stage::Token)
        );
        assert_eq!(
            PgleaseError::MetadataParse("no endpoint".into()).stage(),
            Some(Stage::Metadata)
        );
        assert_eq!(
            PgleaseError::CredentialMissing("db1".into()).stage(),
            Some(Stage::Credential)
        );
        assert_eq!(
            PgleaseError::AuthenticationRejected("28P01".into()).stage(),
            Some(Stage::Connect)
        );
        assert_eq!(
            PgleaseError::DeadlineExceeded { stage: Stage::Flow }.stage(),
            Some(Stage::Flow)
        );
        assert_eq!(PgleaseError::Other(anyhow::anyhow!("misc")).stage(), None);
    }

    #[test]
    fn test_stage_display() {
        let err = PgleaseError::DeadlineExceeded {
            stage: Stage::Connect,
        };
        assert_eq!(err.to_string(), "connection deadline exceeded");
    }

    #[test]
    fn test_mismatch_display() {
        let err = PgleaseError::InstanceMismatch {
            instance: "db1".to_string(),
            granted: "db2, db3".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("db1"));
        assert!(msg.contains("db2, db3"));
    }

    #[test]
    fn test_rejected_is_rerunnable() {
        assert!(PgleaseError::AuthenticationRejected("expired".into()).is_rerunnable());
        assert!(!PgleaseError::InstanceNotFound("db1".into()).is_rerunnable());
    }
}
