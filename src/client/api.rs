//! Core HTTP client for the Power BI API

use std::{fmt, sync::Arc, time::Duration};

use compact_str::{format_compact, CompactString};
use reqwest::{header, Client, Method, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use super::{
    config::ClientConfig,
    error::{ClientError, Result},
    retry::{AttemptOutcome, RetryPolicy},
};
use crate::auth::{CredentialProvider, TokenCredential};

/// Async Power BI API client
///
/// Every call takes the same path: fetch a bearer token, build the request,
/// send it under the retry policy, then decode the response or turn it into
/// a [ClientError].
#[derive(Debug)]
pub struct PowerBiApi {
    client: Client,
    config: ClientConfig,
    base_url: Url,
    retry: RetryPolicy,
    credentials: CredentialProvider,
}

/// Power BI API error response: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
struct PowerBiApiError {
    error: PowerBiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct PowerBiErrorDetail {
    code: CompactString,
    message: Option<CompactString>,
}

/// Name and target of an endpoint call, carried by errors for attribution
#[derive(Debug, Clone)]
pub(crate) struct Operation {
    name: &'static str,
    target: Option<CompactString>,
}

impl Operation {
    pub fn new(name: &'static str) -> Self {
        Self { name, target: None }
    }

    pub fn on(name: &'static str, target: impl fmt::Display) -> Self {
        Self { name, target: Some(format_compact!("{target}")) }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{} [{}]", self.name, target),
            None => write!(f, "{}", self.name),
        }
    }
}

impl PowerBiApi {
    /// Create a client that resolves its credential from the environment
    /// on first use
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Self::http_client(&config)?;
        let credentials = CredentialProvider::from_environment(client.clone());
        Self::assemble(config, client, credentials)
    }

    /// Create a client that authenticates with `credential`
    pub fn with_credential(config: ClientConfig, credential: Arc<dyn TokenCredential>) -> Result<Self> {
        Self::with_credential_provider(config, CredentialProvider::fixed(credential))
    }

    /// Create a client with a custom credential resolution strategy
    pub fn with_credential_provider(
        config: ClientConfig,
        credentials: CredentialProvider,
    ) -> Result<Self> {
        let client = Self::http_client(&config)?;
        Self::assemble(config, client, credentials)
    }

    /// Replace the retry policy derived from the configuration
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The credential provider of this client
    pub fn credentials(&self) -> &CredentialProvider {
        &self.credentials
    }

    fn http_client(config: &ClientConfig) -> Result<Client> {
        config.validate()?;

        Client::builder()
            .timeout(config.request.timeout)
            .build()
            .map_err(|e| ClientError::config(format!("failed to build HTTP client: {e}")))
    }

    fn assemble(config: ClientConfig, client: Client, credentials: CredentialProvider) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ClientError::config_validation("base_url", format!("{e}: {}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::config_validation("base_url", "must be an absolute URL"));
        }

        let retry = RetryPolicy::from(&config.request);
        Ok(Self { client, config, base_url, retry, credentials })
    }

    /// Fetch a bearer token and start a request
    ///
    /// No request is built when the token cannot be obtained.
    pub(crate) async fn prepare(&self, method: Method, segments: &[&str]) -> Result<AuthorizedRequest<'_>> {
        let token = self.credentials.token().await?;

        Ok(AuthorizedRequest {
            api: self,
            method,
            url: self.endpoint(segments),
            bearer: token.token,
            body: None,
        })
    }

    /// `{base_url}/v1.0/myorg/{segments...}` with each segment percent-encoded
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["v1.0", "myorg"]).extend(segments);
        }
        url
    }

    /// Send under the retry policy; the request is rebuilt for every attempt
    async fn send(&self, request: &AuthorizedRequest<'_>, operation: &Operation) -> Result<Response> {
        let mut retries = 0;

        loop {
            trace!(method = %request.method, url = %request.url, attempt = retries + 1, "Sending request");
            let result = request.build().send().await;

            let outcome = match &result {
                Ok(response) => AttemptOutcome::Status(response.status().as_u16()),
                Err(_) => AttemptOutcome::TransportFailure,
            };

            if !self.retry.should_retry(retries, &outcome) {
                return result.map_err(|e| ClientError::transport(format_compact!("{operation}"), e));
            }

            let retry_after = result.as_ref().ok().and_then(retry_after);
            drop(result);
            let delay = self.retry.backoff(retries, retry_after);
            retries += 1;
            warn!(
                operation = %operation,
                outcome = ?outcome,
                retry = retries,
                max_retries = self.retry.max_retries(),
                delay_ms = delay.as_millis() as u64,
                "Retrying request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Handle HTTP response and deserialize JSON
    async fn handle_response<T>(&self, response: Response, operation: &Operation) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url_path = response.url().path().to_string();
        let body = self.success_body(response, operation).await?;

        serde_json::from_str(&body).map_err(|e| ClientError::json_parse(url_path, e))
    }

    /// Body of a 2xx response, or the API error for anything else
    async fn success_body(&self, response: Response, operation: &Operation) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::transport(format_compact!("{operation}"), e))?;

        trace!(status = status.as_u16(), body = %body, "Received response");

        if status.is_success() {
            Ok(body)
        } else {
            Err(Self::error_response(operation, status, &body))
        }
    }

    /// Build an error from a non-success Power BI API response
    fn error_response(operation: &Operation, status: StatusCode, body: &str) -> ClientError {
        let message = match serde_json::from_str::<PowerBiApiError>(body) {
            Ok(PowerBiApiError { error: PowerBiErrorDetail { code, message: Some(message) } }) => {
                format_compact!("{code}: {message}")
            },
            Ok(PowerBiApiError { error: PowerBiErrorDetail { code, message: None } }) => code,
            Err(_) if body.trim().is_empty() => {
                status.canonical_reason().unwrap_or("no response body").into()
            },
            Err(_) => body.trim().into(),
        };

        ClientError::api(format_compact!("{operation}"), status.as_u16(), message)
    }

    /// Validate API connection and credentials
    #[instrument(skip(self))]
    pub async fn validate_connection(&self) -> Result<()> {
        let operation = Operation::new("ValidateConnection");
        let response: serde_json::Value = self
            .prepare(Method::GET, &["groups"])
            .await?
            .query("$top", "1")
            .fetch(&operation)
            .await?;

        if response.get("value").is_some_and(|v| v.is_array()) {
            debug!("Connection validation successful");
            Ok(())
        } else {
            Err(ClientError::api(
                format_compact!("{operation}"),
                200,
                format_compact!("Invalid response format: {response}"),
            ))
        }
    }
}

/// A request carrying a bearer token, ready to be sent
pub(crate) struct AuthorizedRequest<'a> {
    api: &'a PowerBiApi,
    method: Method,
    url: Url,
    bearer: CompactString,
    body: Option<Vec<u8>>,
}

impl AuthorizedRequest<'_> {
    /// Add a query parameter; empty values are left out
    pub fn query(mut self, key: &str, value: &str) -> Self {
        if !value.is_empty() {
            self.url.query_pairs_mut().append_pair(key, value);
        }
        self
    }

    /// Add a query parameter when `value` is present and non-empty
    pub fn query_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Add a numeric query parameter when `value` is present and non-zero
    pub fn query_count(self, key: &str, value: Option<u32>) -> Self {
        match value.filter(|v| *v > 0) {
            Some(value) => self.query(key, &value.to_string()),
            None => self,
        }
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body).map_err(|e| ClientError::json_parse(self.url.path(), e))?;
        self.body = Some(bytes);
        Ok(self)
    }

    /// Send and decode the JSON response
    pub async fn fetch<T: DeserializeOwned>(self, operation: &Operation) -> Result<T> {
        let response = self.api.send(&self, operation).await?;
        self.api.handle_response(response, operation).await
    }

    /// Send, expecting no meaningful response body
    pub async fn execute(self, operation: &Operation) -> Result<()> {
        let response = self.api.send(&self, operation).await?;
        self.api.success_body(response, operation).await.map(|_| ())
    }

    fn build(&self) -> reqwest::RequestBuilder {
        let request = self
            .api
            .client
            .request(self.method.clone(), self.url.clone())
            .bearer_auth(self.bearer.as_str());

        match &self.body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.clone()),
            None => request,
        }
    }
}

/// `Retry-After` in seconds, as sent with 429 responses
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
