use std::time::Duration;

use async_trait::async_trait;
use compact_str::{format_compact, CompactString};
use tracing::{debug, instrument};

use super::{AccessToken, OAuthError, TokenCache, TokenCredential, TokenResponse};
use crate::client::error::{ClientError, Result};

pub const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Where the managed identity token is requested from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedIdentityEndpoint {
    /// Azure instance metadata service (VMs, AKS nodes)
    Imds { url: CompactString },
    /// App Service and Functions: `IDENTITY_ENDPOINT` with `IDENTITY_HEADER`
    AppService { url: CompactString, header: CompactString },
}

impl Default for ManagedIdentityEndpoint {
    fn default() -> Self {
        Self::Imds { url: IMDS_ENDPOINT.into() }
    }
}

/// Managed identity of the Azure host the process runs on
#[derive(Debug)]
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    endpoint: ManagedIdentityEndpoint,
    /// Client id of a user-assigned identity; system-assigned when absent
    client_id: Option<CompactString>,
    imds_timeout: Duration,
    cache: TokenCache,
}

impl ManagedIdentityCredential {
    pub fn new(http: reqwest::Client, endpoint: ManagedIdentityEndpoint) -> Self {
        Self {
            http,
            endpoint,
            client_id: None,
            imds_timeout: Duration::from_secs(2),
            cache: TokenCache::default(),
        }
    }

    pub fn with_client_id(mut self, client_id: Option<CompactString>) -> Self {
        self.client_id = client_id;
        self
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken> {
        // managed identity endpoints take a resource, not a scope
        let resource = scope.trim_end_matches("/.default");

        let mut query = vec![("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let request = match &self.endpoint {
            ManagedIdentityEndpoint::Imds { url } => {
                query.push(("api-version", "2018-02-01"));
                self.http.get(url.as_str()).header("Metadata", "true")
            },
            ManagedIdentityEndpoint::AppService { url, header } => {
                query.push(("api-version", "2019-08-01"));
                self.http.get(url.as_str()).header("X-IDENTITY-HEADER", header.as_str())
            },
        };

        debug!(endpoint = ?self.endpoint, "Requesting managed identity token");
        let response = request
            .query(&query)
            .timeout(self.imds_timeout)
            .send()
            .await
            .map_err(|e| {
                ClientError::authentication(format_compact!("managed identity unavailable: {e}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ClientError::authentication(format_compact!("managed identity unavailable: {e}"))
        })?;

        if !status.is_success() {
            return Err(ClientError::authentication(format_compact!(
                "managed identity rejected the request with HTTP {}: {}",
                status.as_u16(),
                OAuthError::describe(&body)
            )));
        }

        serde_json::from_str::<TokenResponse>(&body)
            .map(TokenResponse::into_access_token)
            .map_err(|e| ClientError::authentication(format_compact!("malformed token response: {e}")))
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        "ManagedIdentity"
    }

    #[instrument(skip(self))]
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        self.cache.get_or_refresh(|| self.request_token(scope)).await
    }
}
