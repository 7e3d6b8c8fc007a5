use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use log::debug;

use crate::processor::RequestProcessor;
use crate::request::{
  HealthStatus, LlmRequest, ModelList, PlatformList, ProcessResult,
};
use super::ProcessorTransport;

/// Processor living in the same process, no network in between.
/// Processing never suspends, so the timeout is not consulted.
pub struct InProcessTransport
{   name: String
  , processor: Arc<RequestProcessor>
}

impl InProcessTransport
{   pub fn new(name: &str, processor: Arc<RequestProcessor>) -> Self
    {   debug!("Creating InProcessTransport {}", name);
        InProcessTransport
        {   name: name.to_string()
          , processor
        }
    }
}

#[async_trait]
impl ProcessorTransport for InProcessTransport
{   fn name(&self) -> &str
    {   &self.name
    }

    async fn process(
      &self
    , request: &LlmRequest
    , _timeout: Duration
    ) -> Result<ProcessResult, crate::error::Error>
    {   Ok(self.processor.process(request))
    }

    async fn health(
      &self
    , _timeout: Duration
    ) -> Result<HealthStatus, crate::error::Error>
    {   Ok(self.processor.health())
    }

    async fn supported_models(
      &self
    , _timeout: Duration
    ) -> Result<ModelList, crate::error::Error>
    {   Ok(self.processor.supported_models())
    }

    async fn supported_platforms(
      &self
    , _timeout: Duration
    ) -> Result<PlatformList, crate::error::Error>
    {   Ok(self.processor.supported_platforms())
    }
}
