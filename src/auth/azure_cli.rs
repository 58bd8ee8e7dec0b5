use std::{io::ErrorKind, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use compact_str::{format_compact, CompactString};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{AccessToken, TokenCache, TokenCredential};
use crate::client::error::{ClientError, Result};

/// Signed-in account of the Azure CLI (`az login`), for developer machines
#[derive(Debug)]
pub struct AzureCliCredential {
    program: CompactString,
    leading_args: Vec<CompactString>,
    tenant_id: Option<CompactString>,
    timeout: Duration,
    cache: TokenCache,
}

/// `az account get-access-token --output json`
#[derive(Debug, Deserialize)]
struct CliToken {
    #[serde(rename = "accessToken")]
    access_token: CompactString,
    /// Unix timestamp, only printed by newer CLI versions
    #[serde(rename = "expires_on", default)]
    expires_on: Option<i64>,
    /// Local time, e.g. `2024-01-01 12:00:00.000000`
    #[serde(rename = "expiresOn", default)]
    expires_on_local: Option<CompactString>,
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureCliCredential {
    pub fn new() -> Self {
        let (program, leading_args): (&str, Vec<CompactString>) = if cfg!(windows) {
            ("cmd", vec!["/C".into(), "az".into()])
        } else {
            ("az", vec![])
        };

        Self {
            program: program.into(),
            leading_args,
            tenant_id: None,
            timeout: Duration::from_secs(10),
            cache: TokenCache::default(),
        }
    }

    /// Request tokens for this tenant instead of the CLI's default one
    pub fn with_tenant(mut self, tenant_id: Option<CompactString>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Run `program` with `leading_args` in place of the `az` executable
    pub fn with_command<I, S>(mut self, program: impl Into<CompactString>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        self.program = program.into();
        self.leading_args = leading_args.into_iter().map(Into::into).collect();
        self
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken> {
        let resource = scope.trim_end_matches("/.default");

        let mut command = Command::new(self.program.as_str());
        command
            .args(self.leading_args.iter().map(CompactString::as_str))
            .args(["account", "get-access-token", "--output", "json", "--resource", resource])
            .kill_on_drop(true);
        if let Some(tenant_id) = &self.tenant_id {
            command.args(["--tenant", tenant_id.as_str()]);
        }

        debug!(program = %self.program, resource, "Requesting token from Azure CLI");
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ClientError::authentication("Azure CLI did not respond in time"))?
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ClientError::authentication("Azure CLI not found on PATH"),
                _ => ClientError::authentication(format_compact!("cannot run Azure CLI: {e}")),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.contains("az login") {
                format_compact!("Azure CLI is not logged in, run `az login`")
            } else {
                format_compact!("Azure CLI failed: {}", stderr.trim())
            };
            return Err(ClientError::authentication(message));
        }

        parse_cli_token(&output.stdout)
    }
}

fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken> {
    let token: CliToken = serde_json::from_slice(stdout).map_err(|e| {
        ClientError::authentication(format_compact!("malformed Azure CLI output: {e}"))
    })?;

    let expires_on = token
        .expires_on
        .and_then(|on| DateTime::from_timestamp(on, 0))
        .or_else(|| token.expires_on_local.as_deref().and_then(parse_local_time))
        // unknown lifetime: never reuse
        .unwrap_or_else(Utc::now);

    Ok(AccessToken::new(token.access_token, expires_on))
}

fn parse_local_time(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()?
        .and_local_timezone(Local)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "AzureCli"
    }

    #[instrument(skip(self))]
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        self.cache.get_or_refresh(|| self.request_token(scope)).await
    }
}
