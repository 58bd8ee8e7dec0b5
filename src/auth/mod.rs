//! Credentials and bearer tokens for the Power BI API
//!
//! A [CredentialProvider] resolves a credential once per client, on first
//! use, and exchanges it for tokens scoped to the Power BI API on every
//! request. Credentials that talk to an identity endpoint keep their own
//! token until shortly before it expires.

mod azure_cli;
mod client_secret;
mod default;
mod managed_identity;
mod workload_identity;

use std::{fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Deserializer};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, instrument};

pub use azure_cli::AzureCliCredential;
pub use client_secret::ClientSecretCredential;
pub use default::DefaultCredential;
pub use managed_identity::{ManagedIdentityCredential, ManagedIdentityEndpoint};
pub use workload_identity::WorkloadIdentityCredential;

use crate::client::error::{ClientError, Result};

/// The single audience every token is requested for
pub const POWERBI_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";

/// Tokens closer than this to their expiry are refreshed
fn refresh_margin() -> TimeDelta {
    TimeDelta::minutes(5)
}

/// A bearer token and the instant it stops being valid
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: CompactString,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<CompactString>, expires_on: DateTime<Utc>) -> Self {
        Self { token: token.into(), expires_on }
    }

    /// True when the token expires within `margin` from now
    pub fn is_expiring(&self, margin: TimeDelta) -> bool {
        self.expires_on - margin <= Utc::now()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Source of bearer tokens for an authenticated identity
#[async_trait]
pub trait TokenCredential: Send + Sync + fmt::Debug {
    /// Short name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Request a token for `scope`
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

/// A fixed token, e.g. one handed over by a host application
#[derive(Clone)]
pub struct StaticTokenCredential {
    token: AccessToken,
}

impl StaticTokenCredential {
    /// A token that is treated as never expiring
    pub fn new(token: impl Into<CompactString>) -> Self {
        Self { token: AccessToken::new(token, DateTime::<Utc>::MAX_UTC) }
    }
}

impl fmt::Debug for StaticTokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenCredential").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    fn name(&self) -> &'static str {
        "StaticToken"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        Ok(self.token.clone())
    }
}

pub type CredentialResolver =
    Box<dyn Fn() -> Result<Arc<dyn TokenCredential>> + Send + Sync>;

/// Lazily resolved, then immutable, credential of a client instance
pub struct CredentialProvider {
    resolver: CredentialResolver,
    credential: OnceCell<Arc<dyn TokenCredential>>,
}

impl CredentialProvider {
    /// Resolve the credential with `resolver` on first use
    pub fn new<F>(resolver: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn TokenCredential>> + Send + Sync + 'static,
    {
        Self {
            resolver: Box::new(resolver),
            credential: OnceCell::new(),
        }
    }

    /// Platform-default resolution, see [DefaultCredential]
    pub fn from_environment(http: reqwest::Client) -> Self {
        Self::new(move || {
            let credential = DefaultCredential::from_env(http.clone())?;
            Ok(Arc::new(credential) as Arc<dyn TokenCredential>)
        })
    }

    /// Always use `credential`
    pub fn fixed(credential: Arc<dyn TokenCredential>) -> Self {
        Self::new(move || Ok(Arc::clone(&credential)))
    }

    /// The credential of this client, resolving it on first call.
    ///
    /// Concurrent first callers wait for a single resolution. A failed
    /// resolution is not cached; the next call tries again.
    pub async fn obtain(&self) -> Result<Arc<dyn TokenCredential>> {
        self.credential
            .get_or_try_init(|| async {
                let credential = (self.resolver)()?;
                debug!(credential = credential.name(), "Resolved credential");
                Ok::<_, ClientError>(credential)
            })
            .await
            .cloned()
    }

    /// Exchange the credential for a token scoped to the Power BI API
    #[instrument(skip(self))]
    pub async fn token(&self) -> Result<AccessToken> {
        let credential = self.obtain().await?;
        credential.get_token(POWERBI_SCOPE).await
    }

    pub fn is_resolved(&self) -> bool {
        self.credential.initialized()
    }
}

impl fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("credential", &self.credential.get())
            .finish_non_exhaustive()
    }
}

/// Last token handed out by a credential
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    token: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    /// The cached token, or a fresh one from `refresh` when none is cached
    /// or the cached one is about to expire
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<AccessToken>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken>>,
    {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| !t.is_expiring(refresh_margin())) {
            return Ok(token.clone());
        }

        let token = refresh().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

/// Token endpoint response, shared by the OAuth2 and managed identity flows
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: CompactString,
    #[serde(default, deserialize_with = "lenient_seconds")]
    expires_in: Option<i64>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    expires_on: Option<i64>,
}

impl TokenResponse {
    pub fn into_access_token(self) -> AccessToken {
        let expires_on = self
            .expires_on
            .and_then(|on| DateTime::from_timestamp(on, 0))
            .or_else(|| {
                self.expires_in
                    .and_then(TimeDelta::try_seconds)
                    .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            })
            // unknown lifetime: never reuse
            .unwrap_or_else(Utc::now);

        AccessToken::new(self.access_token, expires_on)
    }
}

/// Identity error body: `{"error": "...", "error_description": "..."}`
#[derive(Debug, Deserialize)]
pub(crate) struct OAuthError {
    error: CompactString,
    error_description: Option<CompactString>,
}

impl OAuthError {
    pub fn describe(body: &str) -> CompactString {
        match serde_json::from_str::<OAuthError>(body) {
            Ok(e) => match e.error_description {
                Some(description) => compact_str::format_compact!("{}: {}", e.error, description),
                None => e.error,
            },
            Err(_) => body.into(),
        }
    }
}

/// Managed identity endpoints send numbers as strings
fn lenient_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(i64),
        Text(CompactString),
    }

    Ok(match Option::<Seconds>::deserialize(deserializer)? {
        Some(Seconds::Number(n)) => Some(n),
        Some(Seconds::Text(s)) => s.parse().ok(),
        None => None,
    })
}
