use std::sync::Arc;

use async_trait::async_trait;
use compact_str::{format_compact, CompactString};
use tracing::{debug, instrument};

use super::{
    client_secret::DEFAULT_AUTHORITY_HOST, AccessToken, AzureCliCredential, ClientSecretCredential,
    ManagedIdentityCredential, ManagedIdentityEndpoint, StaticTokenCredential, TokenCredential,
    WorkloadIdentityCredential,
};
use crate::client::error::{ClientError, Result};

const ACCESS_TOKEN: &str = "POWERBI_ACCESS_TOKEN";
const TENANT_ID: &str = "AZURE_TENANT_ID";
const CLIENT_ID: &str = "AZURE_CLIENT_ID";
const CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
const AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";
const FEDERATED_TOKEN_FILE: &str = "AZURE_FEDERATED_TOKEN_FILE";
const IDENTITY_ENDPOINT: &str = "IDENTITY_ENDPOINT";
const IDENTITY_HEADER: &str = "IDENTITY_HEADER";

/// Platform-default credential chain
///
/// Built from the environment. A pre-issued token, when supplied, is used on
/// its own. Otherwise the chain holds, in order: a client-secret service
/// principal and a workload identity (each only when fully configured), the
/// host's managed identity, and the Azure CLI login. Tokens come from the
/// first source that produces one.
#[derive(Debug)]
pub struct DefaultCredential {
    sources: Vec<Arc<dyn TokenCredential>>,
}

impl DefaultCredential {
    /// Resolve the chain from process environment variables
    pub fn from_env(http: reqwest::Client) -> Result<Self> {
        Self::from_lookup(http, |key| std::env::var(key).ok())
    }

    /// Resolve the chain from `lookup`, which maps variable names to values
    pub fn from_lookup<F>(http: reqwest::Client, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = var(ACCESS_TOKEN) {
            debug!("Using access token from {ACCESS_TOKEN}");
            return Ok(Self { sources: vec![Arc::new(StaticTokenCredential::new(token))] });
        }

        let tenant_id = var(TENANT_ID);
        let client_id = var(CLIENT_ID);
        let authority = var(AUTHORITY_HOST).unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.into());
        let mut sources: Vec<Arc<dyn TokenCredential>> = vec![];

        match (&tenant_id, &client_id, var(CLIENT_SECRET)) {
            (Some(tenant), Some(client), Some(secret)) => {
                let credential = ClientSecretCredential::new(http.clone(), tenant.as_str(), client.as_str(), secret)
                    .with_authority_host(authority.as_str());
                sources.push(Arc::new(credential));
            },
            (None, None, None) => {},
            (tenant, client, secret) => {
                let missing = missing([
                    (TENANT_ID, tenant.is_none()),
                    (CLIENT_ID, client.is_none()),
                    (CLIENT_SECRET, secret.is_none()),
                ]);
                debug!(%missing, "Incomplete service principal configuration, skipping client secret");
            },
        }

        if let (Some(tenant), Some(client), Some(token_file)) =
            (&tenant_id, &client_id, var(FEDERATED_TOKEN_FILE))
        {
            let credential = WorkloadIdentityCredential::new(http.clone(), tenant.as_str(), client.as_str(), token_file)
                .with_authority_host(authority.as_str());
            sources.push(Arc::new(credential));
        }

        let endpoint = match (var(IDENTITY_ENDPOINT), var(IDENTITY_HEADER)) {
            (Some(url), Some(header)) => ManagedIdentityEndpoint::AppService {
                url: url.into(),
                header: header.into(),
            },
            _ => ManagedIdentityEndpoint::default(),
        };
        // AZURE_CLIENT_ID selects a user-assigned identity
        sources.push(Arc::new(
            ManagedIdentityCredential::new(http, endpoint)
                .with_client_id(client_id.as_deref().map(CompactString::from)),
        ));

        sources.push(Arc::new(
            AzureCliCredential::new().with_tenant(tenant_id.as_deref().map(CompactString::from)),
        ));

        Ok(Self { sources })
    }

    /// Build a chain from explicit sources, tried in order
    pub fn from_sources(sources: Vec<Arc<dyn TokenCredential>>) -> Result<Self> {
        if sources.is_empty() {
            return Err(ClientError::authentication("no credential sources configured"));
        }
        Ok(Self { sources })
    }

    /// Names of the sources in the order they are tried
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

fn missing<const N: usize>(vars: [(&str, bool); N]) -> CompactString {
    let names: Vec<&str> = vars
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect();
    CompactString::from(names.join(", "))
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    fn name(&self) -> &'static str {
        "Default"
    }

    #[instrument(skip(self))]
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut failures: Vec<CompactString> = vec![];

        for source in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => return Ok(token),
                Err(e) => {
                    debug!(credential = source.name(), error = %e, "Credential source failed");
                    failures.push(format_compact!("{}: {}", source.name(), e));
                },
            }
        }

        Err(ClientError::authentication(format_compact!(
            "no credential produced a token ({})",
            failures.join("; ")
        )))
    }
}
