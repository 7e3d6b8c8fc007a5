//! The request processor: validate, synthesize, describe.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use log::{debug, info, trace};

use crate::config::ProcessorConfig;
use crate::metadata::build_metadata;
use crate::request::{
  now_iso8601, HealthStatus, LlmRequest, ModelList, PlatformList,
  ProcessResult, ResultStatus, ServiceInfo,
};
use crate::synthesis::{ResponseSynthesizer, TemplateSynthesizer};
use crate::tracker::{RequestTracker, TrackerStats};
use crate::validation::validate;
use crate::{Model, Platform};

/// Lifecycle of one process call.
/// received -> validated -> completed, or received -> rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState
{   Received
  , Validated
  , Completed
  , Rejected
}

impl ProcessingState
{   pub fn is_terminal(&self) -> bool
    {   matches!(self, ProcessingState::Completed | ProcessingState::Rejected)
    }
}

/// Stateless per request; the tracker is the only shared piece
pub struct RequestProcessor
{   config: ProcessorConfig
  , tracker: Arc<RequestTracker>
  , synthesizer: Arc<dyn ResponseSynthesizer>
}

impl RequestProcessor
{   pub fn new(
      config: ProcessorConfig
    , tracker: Arc<RequestTracker>
    ) -> Self
    {   RequestProcessor::with_synthesizer(
          config,
          tracker,
          Arc::new(TemplateSynthesizer)
        )
    }

    pub fn with_synthesizer(
      config: ProcessorConfig
    , tracker: Arc<RequestTracker>
    , synthesizer: Arc<dyn ResponseSynthesizer>
    ) -> Self
    {   debug!("Creating RequestProcessor {}", config.service_name);
        RequestProcessor
        {   config
          , tracker
          , synthesizer
        }
    }

    pub fn config(&self) -> &ProcessorConfig
    {   &self.config
    }

    pub fn tracker(&self) -> &Arc<RequestTracker>
    {   &self.tracker
    }

    /// Run one request through the pipeline.
    /// Always yields exactly one result; validation failures
    /// come back as status=error, never as a fault.
    pub fn process(&self, request: &LlmRequest) -> ProcessResult
    {   let start = Instant::now();
        let request_id = self.tracker.begin();
        let mut state = ProcessingState::Received;
        debug!("Processing request {}", request_id);

        let validated = match validate(request, &self.config.limits)
        {   Ok(v) => v
          , Err(err) => {
              state = transition(&request_id, state, ProcessingState::Rejected);
              self.tracker.mark_rejected();
              let elapsed = elapsed_ms(start);
              info!(
                "Request {} rejected in {:.2}ms: {}",
                request_id, elapsed, err
              );
              debug_assert!(state.is_terminal());
              return ProcessResult
              {   request_id
                , status: ResultStatus::Error
                , response_text: None
                , metadata: None
                , error: Some(err.to_string())
                , invalid_fields: err
                    .fields()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
                , timestamp: now_iso8601()
                , processing_time_ms: elapsed
              };
            }
        };
        state = transition(&request_id, state, ProcessingState::Validated);

        let response_text = self.synthesizer.synthesize(&validated);
        let metadata = build_metadata(&validated, &response_text);
        let elapsed = elapsed_ms(start);

        state = transition(&request_id, state, ProcessingState::Completed);
        debug_assert!(state.is_terminal());
        self.tracker.mark_completed();
        info!(
          "Request {} processed successfully in {:.2}ms",
          request_id, elapsed
        );

        ProcessResult
        {   request_id
          , status: ResultStatus::Success
          , response_text: Some(response_text)
          , metadata: Some(metadata)
          , error: None
          , invalid_fields: vec![]
          , timestamp: now_iso8601()
          , processing_time_ms: elapsed
        }
    }

    pub fn health(&self) -> HealthStatus
    {   debug!("Health check");
        HealthStatus
        {   status: "healthy".to_string()
          , timestamp: now_iso8601()
          , version: self.config.version.clone()
        }
    }

    pub fn supported_models(&self) -> ModelList
    {   let models = Model::names();
        ModelList
        {   count: models.len()
          , supported_models: models
          , source: None
        }
    }

    pub fn supported_platforms(&self) -> PlatformList
    {   let platforms = Platform::names();
        PlatformList
        {   count: platforms.len()
          , supported_platforms: platforms
          , source: None
        }
    }

    /// Root description with the endpoint map
    pub fn info(&self) -> ServiceInfo
    {   let mut endpoints = BTreeMap::new();
        for name in ["health", "process", "models", "platforms"]
        {   endpoints.insert(name.to_string(), format!("/{}", name));
        }
        ServiceInfo
        {   service: self.config.service_name.clone()
          , version: self.config.version.clone()
          , description: "Simulated LLM request processing".to_string()
          , endpoints
        }
    }

    pub fn stats(&self) -> TrackerStats
    {   self.tracker.stats()
    }
}

impl Default for RequestProcessor
{   fn default() -> Self
    {   RequestProcessor::new(
          ProcessorConfig::default(),
          Arc::new(RequestTracker::new())
        )
    }
}

fn transition(
  request_id: &str
, from: ProcessingState
, to: ProcessingState
) -> ProcessingState
{   trace!("Request {}: {:?} -> {:?}", request_id, from, to);
    to
}

/// Monotonic clock, so never negative
fn elapsed_ms(start: Instant) -> f64
{   start.elapsed().as_secs_f64() * 1000.0
}
