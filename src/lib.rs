//! Typed client for the Power BI REST API
//!
//! Covers workspaces ("groups"), workspace users and deployment pipelines.
//! Credentials are resolved lazily from the environment, requests are retried
//! on rate limiting and transport failures, and outgoing payloads are reduced
//! to the shape the API accepts before anything is sent.
//!
//! ```no_run
//! use powerbi_client::{ListQuery, PowerBiClient};
//!
//! let client = PowerBiClient::new(None)?;
//! for group in client.list_groups(&ListQuery::new())?.into_inner() {
//!     println!("{} {}", group.id, group.name);
//! }
//! # Ok::<(), powerbi_client::ClientError>(())
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod domain;
pub mod id;
pub mod logging;
pub mod shape;

pub use auth::{AccessToken, CredentialProvider, DefaultCredential, StaticTokenCredential, TokenCredential};
pub use client::{ClientConfig, ClientError, ListQuery, PowerBiApi, PowerBiClient, Result, RetryPolicy};
pub use id::{GroupId, PipelineId};
