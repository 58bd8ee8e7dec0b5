use std::{fmt, path::PathBuf};

use async_trait::async_trait;
use compact_str::{format_compact, CompactString};
use tracing::{debug, instrument};

use super::{
    client_secret::{request_entra_token, token_url, DEFAULT_AUTHORITY_HOST},
    AccessToken, TokenCache, TokenCredential,
};
use crate::client::error::{ClientError, Result};

const JWT_BEARER_ASSERTION: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Federated identity of a Kubernetes workload
///
/// Exchanges the service account token projected into
/// `AZURE_FEDERATED_TOKEN_FILE` for an Entra ID token (client assertion
/// grant). The file is read on every exchange since the kubelet rotates it.
pub struct WorkloadIdentityCredential {
    http: reqwest::Client,
    authority_host: CompactString,
    tenant_id: CompactString,
    client_id: CompactString,
    token_file: PathBuf,
    cache: TokenCache,
}

impl WorkloadIdentityCredential {
    pub fn new(
        http: reqwest::Client,
        tenant_id: impl Into<CompactString>,
        client_id: impl Into<CompactString>,
        token_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http,
            authority_host: DEFAULT_AUTHORITY_HOST.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            token_file: token_file.into(),
            cache: TokenCache::default(),
        }
    }

    pub fn with_authority_host(mut self, authority_host: impl Into<CompactString>) -> Self {
        self.authority_host = authority_host.into();
        self
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken> {
        let assertion = tokio::fs::read_to_string(&self.token_file).await.map_err(|e| {
            ClientError::authentication(format_compact!(
                "cannot read federated token file {}: {e}",
                self.token_file.display()
            ))
        })?;

        debug!(client_id = %self.client_id, token_file = %self.token_file.display(), "Exchanging federated token");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_assertion_type", JWT_BEARER_ASSERTION),
            ("client_assertion", assertion.trim()),
            ("scope", scope),
        ];

        request_entra_token(&self.http, &token_url(&self.authority_host, &self.tenant_id), &params).await
    }
}

impl fmt::Debug for WorkloadIdentityCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkloadIdentityCredential")
            .field("authority_host", &self.authority_host)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("token_file", &self.token_file)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCredential for WorkloadIdentityCredential {
    fn name(&self) -> &'static str {
        "WorkloadIdentity"
    }

    #[instrument(skip(self), fields(client_id = %self.client_id))]
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        self.cache.get_or_refresh(|| self.request_token(scope)).await
    }
}
