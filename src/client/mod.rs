//! Power BI client modules
//!
//! The async [PowerBiApi] does the work: token, request, retry, decode.
//! Endpoint groups live in their own modules as `impl PowerBiApi` blocks,
//! and [PowerBiClient] exposes the same operations synchronously.

pub mod api;
pub mod blocking;
pub mod config;
pub mod error;
mod groups;
mod pipelines;
pub mod retry;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use api::PowerBiApi;
pub use blocking::PowerBiClient;
pub use config::{ClientConfig, ListQuery, RequestConfig};
pub use error::ClientError;
pub use retry::{AttemptOutcome, RetryPolicy};

pub type Result<T> = std::result::Result<T, ClientError>;
