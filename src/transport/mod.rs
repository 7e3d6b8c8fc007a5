//! How the proxy reaches a request processor

pub mod http;
pub mod local;

use std::time::Duration;
use async_trait::async_trait;

use crate::request::{
  HealthStatus, LlmRequest, ModelList, PlatformList, ProcessResult,
};

// Re-export for convenience
pub use http::HttpTransport;
pub use local::InProcessTransport;

/// A reachable request processor.
/// Implementations must give up once `timeout` has passed and
/// release any connection they hold on every exit path.
#[async_trait]
pub trait ProcessorTransport: Send + Sync
{   /// Instance name reported back to proxy callers
    fn name(&self) -> &str;

    async fn process(
      &self
    , request: &LlmRequest
    , timeout: Duration
    ) -> Result<ProcessResult, crate::error::Error>;

    async fn health(
      &self
    , timeout: Duration
    ) -> Result<HealthStatus, crate::error::Error>;

    async fn supported_models(
      &self
    , timeout: Duration
    ) -> Result<ModelList, crate::error::Error>;

    async fn supported_platforms(
      &self
    , timeout: Duration
    ) -> Result<PlatformList, crate::error::Error>;
}
