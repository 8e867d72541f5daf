//! OAuth client-credentials token provider.

use crate::config::Config;
use crate::secret::SecretString;
use crate::token::{BearerToken, IdentityTokenProvider};
use crate::{PgleaseError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

/// Assumed token lifetime when the provider omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Client-credentials token provider.
///
/// Exchanges the configured tenant/client identifiers and client secret for
/// a bearer token scoped to the control-plane audience. The token is not
/// cached beyond the current flow; each run re-authenticates.
pub struct OAuthTokenProvider {
    http: reqwest::Client,
    token_endpoint: String,
    client_id: String,
    client_secret: SecretString,
    scope: String,
}

impl OAuthTokenProvider {
    /// Creates a provider from configuration.
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
            token_endpoint: config.token_endpoint(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[async_trait]
impl IdentityTokenProvider for OAuthTokenProvider {
    async fn acquire_token(&self) -> Result<BearerToken> {
        tracing::debug!(endpoint = %self.token_endpoint, scope = %self.scope, "requesting bearer token");

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                PgleaseError::Authentication(format!("identity provider unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PgleaseError::Authentication(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            PgleaseError::Authentication(format!("malformed token response: {}", e))
        })?;

        if body.access_token.is_empty() {
            return Err(PgleaseError::Authentication(
                "token response contained an empty access_token".to_string(),
            ));
        }

        let lifetime = body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        if lifetime <= 0 {
            return Err(PgleaseError::Authentication(format!(
                "token response declared a non-positive lifetime ({}s)",
                lifetime
            )));
        }

        Ok(BearerToken::new(
            SecretString::new(body.access_token),
            Utc::now() + chrono::Duration::seconds(lifetime),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_parsing() {
        let body: TokenResponse =
            serde_json::from_str(r#"{"access_token":"abc","token_type":"Bearer","expires_in":600}"#)
                .unwrap();
        assert_eq!(body.access_token, "abc");
        assert_eq!(body.expires_in, Some(600));
    }

    #[test]
    fn test_token_response_without_lifetime() {
        let body: TokenResponse = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(body.expires_in, None);
    }
}
