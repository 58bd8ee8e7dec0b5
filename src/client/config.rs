//! Configuration management for the Power BI client

use std::time::Duration;

use compact_str::CompactString;

use super::error::{ClientError, Result};

/// Production host of the Power BI REST API
pub const DEFAULT_BASE_URL: &str = "https://api.powerbi.com";

/// Main configuration for the Power BI client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Power BI API base URL, without the `/v1.0/myorg` prefix
    pub base_url: CompactString,
    /// Request configuration
    pub request: RequestConfig,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Timeout of a single attempt
    pub timeout: Duration,
    /// Maximum number of retries for rate-limited or failed requests
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one
    pub initial_backoff: Duration,
    /// Upper bound for any single retry delay
    pub max_backoff: Duration,
}

/// `$filter`, `$top` and `$skip` passthrough for list endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// OData filter expression, e.g. `name eq 'Sales'`
    pub filter: Option<CompactString>,
    /// Return only the first n results
    pub top: Option<u32>,
    /// Skip the first n results
    pub skip: Option<u32>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<CompactString>) -> Self {
        Self {
            base_url: base_url.into(),
            request: RequestConfig::default(),
        }
    }

    /// Configuration for `base_url`, or the production host when absent
    pub fn with_optional_base_url(base_url: Option<&str>) -> Self {
        match base_url {
            Some(url) if !url.is_empty() => Self::new(url),
            _ => Self::default(),
        }
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::config_validation("base_url", "cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::config_validation(
                "base_url",
                "must start with http:// or https://",
            ));
        }

        if self.request.timeout.is_zero() {
            return Err(ClientError::config_validation("timeout", "must be greater than zero"));
        }

        if self.request.initial_backoff > self.request.max_backoff {
            return Err(ClientError::config_validation(
                "initial_backoff",
                "must not exceed max_backoff",
            ));
        }

        Ok(())
    }

    /// Set request configuration
    pub fn with_request(mut self, request: RequestConfig) -> Self {
        self.request = request;
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = timeout;
        self
    }

    /// Set maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.request.max_retries = max_retries;
        self
    }

    /// Set retry backoff bounds
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.request.initial_backoff = initial;
        self.request.max_backoff = max;
        self
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<CompactString>,
    request: Option<RequestConfig>,
}

impl ClientConfigBuilder {
    /// Set base URL
    pub fn base_url(mut self, url: impl Into<CompactString>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set request configuration
    pub fn request(mut self, request: RequestConfig) -> Self {
        self.request = Some(request);
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let mut request = self.request.unwrap_or_default();
        request.timeout = timeout;
        self.request = Some(request);
        self
    }

    /// Set maximum number of retries
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        let mut request = self.request.unwrap_or_default();
        request.max_retries = max_retries;
        self.request = Some(request);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ClientConfig> {
        let config = ClientConfig {
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            request: self.request.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

impl ListQuery {
    /// Create a new, empty list query
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the OData filter
    pub fn with_filter(mut self, filter: impl Into<CompactString>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set `$top`
    pub fn with_top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    /// Set `$skip`
    pub fn with_skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::builder()
            .base_url("http://localhost:8080")
            .timeout(Duration::from_secs(5))
            .max_retries(1)
            .build()
            .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.request.timeout, Duration::from_secs(5));
        assert_eq!(config.request.max_retries, 1);
    }

    #[test]
    fn test_builder_defaults_to_production_host() {
        let config = ClientConfig::builder().build().unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request.max_retries, 3);
    }

    #[test]
    fn test_optional_base_url() {
        assert_eq!(ClientConfig::with_optional_base_url(None).base_url, DEFAULT_BASE_URL);
        assert_eq!(ClientConfig::with_optional_base_url(Some("")).base_url, DEFAULT_BASE_URL);
        assert_eq!(
            ClientConfig::with_optional_base_url(Some("http://127.0.0.1:9000")).base_url,
            "http://127.0.0.1:9000"
        );
    }

    #[test]
    fn test_config_validation() {
        // Valid config
        assert!(ClientConfig::default().validate().is_ok());

        // Empty base URL
        assert!(ClientConfig::new("").validate().is_err());

        // Invalid URL
        assert!(ClientConfig::new("api.powerbi.com").validate().is_err());

        // Zero timeout
        let config = ClientConfig::default().with_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ClientError::ConfigValidation { field, .. }) if field == "timeout"
        ));

        // Inverted backoff bounds
        let config = ClientConfig::default()
            .with_backoff(Duration::from_secs(5), Duration::from_secs(1));
        assert!(config.validate().is_err());
    }
}
