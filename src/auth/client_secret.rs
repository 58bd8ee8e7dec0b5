use std::fmt;

use async_trait::async_trait;
use compact_str::{format_compact, CompactString};
use tracing::{debug, instrument};

use super::{AccessToken, OAuthError, TokenCache, TokenCredential, TokenResponse};
use crate::client::error::{ClientError, Result};

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Service principal authenticating with a client secret
/// (OAuth2 client credentials grant against Microsoft Entra ID)
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority_host: CompactString,
    tenant_id: CompactString,
    client_id: CompactString,
    client_secret: CompactString,
    cache: TokenCache,
}

impl ClientSecretCredential {
    pub fn new(
        http: reqwest::Client,
        tenant_id: impl Into<CompactString>,
        client_id: impl Into<CompactString>,
        client_secret: impl Into<CompactString>,
    ) -> Self {
        Self {
            http,
            authority_host: DEFAULT_AUTHORITY_HOST.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cache: TokenCache::default(),
        }
    }

    /// Use another authority, e.g. a sovereign cloud
    pub fn with_authority_host(mut self, authority_host: impl Into<CompactString>) -> Self {
        self.authority_host = authority_host.into();
        self
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken> {
        debug!(tenant_id = %self.tenant_id, client_id = %self.client_id, "Requesting token");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        request_entra_token(&self.http, &token_url(&self.authority_host, &self.tenant_id), &params).await
    }
}

/// `{authority}/{tenant}/oauth2/v2.0/token`
pub(super) fn token_url(authority_host: &str, tenant_id: &str) -> CompactString {
    format_compact!("{}/{}/oauth2/v2.0/token", authority_host.trim_end_matches('/'), tenant_id)
}

/// POST a client credentials grant to an Entra ID token endpoint
pub(super) async fn request_entra_token(
    http: &reqwest::Client,
    url: &str,
    params: &[(&str, &str)],
) -> Result<AccessToken> {
    let response = http
        .post(url)
        .form(params)
        .send()
        .await
        .map_err(|e| ClientError::authentication(format_compact!("token request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::authentication(format_compact!("token request failed: {e}")))?;

    if !status.is_success() {
        return Err(ClientError::authentication(format_compact!(
            "token request rejected with HTTP {}: {}",
            status.as_u16(),
            OAuthError::describe(&body)
        )));
    }

    serde_json::from_str::<TokenResponse>(&body)
        .map(TokenResponse::into_access_token)
        .map_err(|e| ClientError::authentication(format_compact!("malformed token response: {e}")))
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("authority_host", &self.authority_host)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &'static str {
        "ClientSecret"
    }

    #[instrument(skip(self), fields(client_id = %self.client_id))]
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        self.cache.get_or_refresh(|| self.request_token(scope)).await
    }
}
