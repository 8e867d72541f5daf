//! Control-plane HTTP client: instance metadata and credential minting.

use crate::config::Config;
use crate::credential::{CredentialBroker, DatabaseCredential};
use crate::metadata::{InstanceDescriptor, MetadataResolver, DEFAULT_PORT};
use crate::secret::SecretString;
use crate::token::BearerToken;
use crate::validation::validate_instance_name;
use crate::{PgleaseError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// HTTP client for the control-plane API.
///
/// Implements both [`MetadataResolver`] and [`CredentialBroker`] over one
/// shared `reqwest` client, the way the two endpoints share one base URL
/// and one bearer token. Cloning is cheap (the HTTP client is reference
/// counted internally).
#[derive(Clone)]
pub struct ControlPlaneClient {
    http: reqwest::Client,
    base_url: String,
}

impl ControlPlaneClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.workspace_url.trim_end_matches('/').to_string(),
        })
    }

    fn instance_url(&self, name: &str) -> String {
        format!("{}/instances/{}", self.base_url, name)
    }

    fn credentials_url(&self) -> String {
        format!("{}/credentials", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct InstanceResponse {
    #[serde(default)]
    read_write_dns: Option<String>,
    #[serde(default)]
    port: Option<u16>,
}

#[derive(Debug, Serialize)]
struct MintRequest<'a> {
    request_id: Uuid,
    instance_names: &'a [String],
}

#[derive(Debug, Deserialize)]
struct MintResponse {
    #[serde(default)]
    token: Option<SecretString>,
    #[serde(default)]
    expiration_time: Option<DateTime<Utc>>,
}

#[async_trait]
impl MetadataResolver for ControlPlaneClient {
    async fn resolve_instance(
        &self,
        token: &BearerToken,
        instance_name: &str,
    ) -> Result<InstanceDescriptor> {
        validate_instance_name(instance_name)?;

        let response = self
            .http
            .get(self.instance_url(instance_name))
            .bearer_auth(token.secret())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PgleaseError::InstanceNotFound(instance_name.to_string()));
        }
        if !status.is_success() {
            return Err(PgleaseError::Other(anyhow::anyhow!(
                "control plane returned {} resolving instance {}",
                status,
                instance_name
            )));
        }

        let body: InstanceResponse = response.json().await.map_err(|e| {
            PgleaseError::MetadataParse(format!(
                "invalid metadata for instance {}: {}",
                instance_name, e
            ))
        })?;

        let endpoint = body
            .read_write_dns
            .filter(|dns| !dns.is_empty())
            .ok_or_else(|| {
                PgleaseError::MetadataParse(format!(
                    "read_write_dns missing for instance {}",
                    instance_name
                ))
            })?;

        Ok(InstanceDescriptor {
            name: instance_name.to_string(),
            read_write_endpoint: endpoint,
            port: body.port.unwrap_or(DEFAULT_PORT),
        })
    }
}

#[async_trait]
impl CredentialBroker for ControlPlaneClient {
    async fn mint_credential(
        &self,
        token: &BearerToken,
        instance_names: &[String],
    ) -> Result<DatabaseCredential> {
        if instance_names.is_empty() {
            return Err(PgleaseError::InvalidInstanceName(
                "instance name set is empty".to_string(),
            ));
        }
        for name in instance_names {
            validate_instance_name(name)?;
        }

        // Fresh id per mint attempt; reusing one across distinct attempts
        // would defeat server-side idempotency tracking.
        let request_id = Uuid::new_v4();
        tracing::debug!(%request_id, instances = ?instance_names, "minting database credential");

        let response = self
            .http
            .post(self.credentials_url())
            .bearer_auth(token.secret())
            .json(&MintRequest {
                request_id,
                instance_names,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PgleaseError::CredentialGeneration(format!(
                "control plane returned {}",
                status
            )));
        }

        let body: MintResponse = response.json().await.map_err(|e| {
            PgleaseError::CredentialGeneration(format!("malformed credential response: {}", e))
        })?;

        let secret = body
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PgleaseError::CredentialMissing(instance_names.join(", ")))?;

        Ok(DatabaseCredential {
            request_id,
            instance_names: instance_names.to_vec(),
            token: secret,
            expires_at: body.expiration_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ControlPlaneClient {
        ControlPlaneClient::new(&Config::new(base)).unwrap()
    }

    #[test]
    fn test_url_construction() {
        let client = client("https://control.example.com/");
        assert_eq!(
            client.instance_url("db1"),
            "https://control.example.com/instances/db1"
        );
        assert_eq!(
            client.credentials_url(),
            "https://control.example.com/credentials"
        );
    }

    #[test]
    fn test_instance_response_parsing() {
        let body: InstanceResponse = serde_json::from_str(
            r#"{"name":"db1","read_write_dns":"db1.example.internal","port":6432,"state":"AVAILABLE"}"#,
        )
        .unwrap();
        assert_eq!(body.read_write_dns.as_deref(), Some("db1.example.internal"));
        assert_eq!(body.port, Some(6432));
    }

    #[test]
    fn test_mint_request_shape() {
        let names = vec!["db1".to_string()];
        let request = MintRequest {
            request_id: Uuid::nil(),
            instance_names: &names,
        };
        let rendered = serde_json::to_value(&request).unwrap();
        assert_eq!(
            rendered["request_id"],
            "00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(rendered["instance_names"][0], "db1");
    }
}
