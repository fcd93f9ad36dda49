//! Client-credentials token acquisition
//!
//! A headless backup job has no user present to complete an interactive
//! sign-in, so authentication here is the OAuth2 client-credentials grant
//! (an app registration's own identity, not a delegated user) rather than
//! the authorization-code/PKCE flow an interactive client would use.

use std::sync::Mutex;

use async_trait::async_trait;
use backup_core::ports::{AuthError, TokenSource};
use chrono::{DateTime, Duration, Utc};
use oauth2::{basic::BasicClient, ClientId, ClientSecret, TokenResponse, TokenUrl};
use tracing::{debug, info};

/// Safety margin subtracted from a token's reported expiry; a caller whose
/// token is within this margin forces a refresh before using it.
const EXPIRY_MARGIN: Duration = Duration::minutes(5);

/// Configuration for the client-credentials grant against a tenant's token
/// endpoint.
#[derive(Debug, Clone)]
pub struct ClientCredentialsConfig {
    /// Application (client) ID from the app registration.
    pub client_id: String,
    /// Application client secret.
    pub client_secret: String,
    /// Directory (tenant) ID.
    pub tenant_id: String,
    /// OAuth scopes to request; for client-credentials this is usually the
    /// resource's `.default` scope.
    pub scopes: Vec<String>,
}

impl ClientCredentialsConfig {
    /// Build a config requesting the Graph resource's default scope.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tenant_id: tenant_id.into(),
            scopes: vec!["https://graph.microsoft.com/.default".to_string()],
        }
    }

    fn token_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        )
    }
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// [`TokenSource`] backed by the OAuth2 client-credentials grant, caching
/// the access token until it nears expiry.
pub struct ClientCredentialsTokenSource {
    config: ClientCredentialsConfig,
    http_client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ClientCredentialsTokenSource {
    /// Create a new token source. No network call is made until the first
    /// [`TokenSource::token`] call.
    pub fn new(config: ClientCredentialsConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedToken, AuthError> {
        let token_url = TokenUrl::new(self.config.token_url()).map_err(|e| AuthError {
            retryable: false,
            message: format!("invalid token endpoint: {e}"),
        })?;

        let client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.config.client_secret.clone()))
            .set_token_uri(token_url);

        let mut request = client.exchange_client_credentials();
        for scope in &self.config.scopes {
            request = request.add_scope(oauth2::Scope::new(scope.clone()));
        }

        debug!("requesting client-credentials token");

        let response = request
            .request_async(&self.http_client)
            .await
            .map_err(|e| AuthError {
                retryable: true,
                message: format!("token request failed: {e}"),
            })?;

        let expires_at = response
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        info!(expires_at = %expires_at, "acquired client-credentials token");

        Ok(CachedToken {
            access_token: response.access_token().secret().to_string(),
            expires_at,
        })
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsTokenSource {
    async fn token(&self) -> Result<String, AuthError> {
        {
            let cached = self.cached.lock().unwrap();
            if let Some(ref t) = *cached {
                if t.expires_at - Utc::now() > EXPIRY_MARGIN {
                    return Ok(t.access_token.clone());
                }
            }
        }
        self.force_refresh().await
    }

    async fn force_refresh(&self) -> Result<String, AuthError> {
        let fresh = self.fetch().await?;
        let token = fresh.access_token.clone();
        *self.cached.lock().unwrap() = Some(fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url_shape() {
        let config = ClientCredentialsConfig::new("id", "secret", "tenant-123");
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/tenant-123/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_default_scope_is_graph_default() {
        let config = ClientCredentialsConfig::new("id", "secret", "tenant-123");
        assert_eq!(config.scopes, vec!["https://graph.microsoft.com/.default".to_string()]);
    }
}
