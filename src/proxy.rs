//! Proxy forwarder: relays requests to a processor and translates
//! unreachable or slow upstreams into typed errors.
//!
//! Validation is left to the processor, so it runs exactly once per
//! request. Results, including status=error rejections, are relayed
//! verbatim; only failures to obtain a result become error envelopes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, error, info, warn};

use crate::config::ProxyConfig;
use crate::request::{
  now_iso8601, ErrorEnvelope, LlmRequest, ModelList, PlatformList,
  ProcessResult, ProxyHealth, ProxyReply, ProxyResponse, ResultStatus,
  ServiceInfo, UpstreamHealth,
};
use crate::retry::{RetryPolicy, UpstreamSequence};
use crate::tracker::RequestTracker;
use crate::transport::{HttpTransport, ProcessorTransport};

/// Source tag on relayed model/platform lists
pub const LIST_SOURCE: &str = "llm_service";

/// One processor the proxy may call
#[derive(Clone)]
pub struct Upstream
{   pub transport: Arc<dyn ProcessorTransport>
  , pub timeout: Duration
}

impl Upstream
{   pub fn new(
      transport: Arc<dyn ProcessorTransport>
    , timeout: Duration
    ) -> Self
    {   Upstream
        {   transport
          , timeout
        }
    }

    pub fn name(&self) -> &str
    {   self.transport.name()
    }
}

impl std::fmt::Debug for Upstream
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("Upstream")
          .field("name", &self.name())
          .field("timeout", &self.timeout)
          .finish()
    }
}

#[derive(Debug)]
pub struct ProxyForwarder
{   upstreams: Vec<Upstream>
  , retry: RetryPolicy
  , health_timeout: Duration
  , tracker: Arc<RequestTracker>
}

impl ProxyForwarder
{   pub fn new(
      upstreams: Vec<Upstream>
    , retry: RetryPolicy
    , health_timeout: Duration
    , tracker: Arc<RequestTracker>
    ) -> Result<Self, crate::error::Error>
    {   if upstreams.is_empty()
        {   error!("ProxyForwarder needs at least one upstream");
            return Err(crate::error::Error::InvalidConfiguration(
              "at least one upstream is required".to_string()
            ));
        }
        debug!(
          "Creating ProxyForwarder with {} upstream(s)",
          upstreams.len()
        );
        Ok(ProxyForwarder
        {   upstreams
          , retry
          , health_timeout
          , tracker
        })
    }

    /// One upstream, no retries, health checks share the call timeout
    pub fn single(
      transport: Arc<dyn ProcessorTransport>
    , timeout: Duration
    , tracker: Arc<RequestTracker>
    ) -> Self
    {   ProxyForwarder
        {   upstreams: vec![Upstream::new(transport, timeout)]
          , retry: RetryPolicy::none()
          , health_timeout: timeout
          , tracker
        }
    }

    /// HTTP upstreams built from configuration
    pub fn from_config(
      config: &ProxyConfig
    , tracker: Arc<RequestTracker>
    ) -> Result<Self, crate::error::Error>
    {   config.validate()?;
        let upstreams = config.upstreams
          .iter()
          .map(|u| {
            let transport: Arc<dyn ProcessorTransport>
              = Arc::new(HttpTransport::new(&u.name, &u.base_url));
            Upstream::new(transport, config.timeout_for(u))
          })
          .collect();
        ProxyForwarder::new(
          upstreams,
          RetryPolicy::from_config(&config.retry),
          config.health_timeout(),
          tracker
        )
    }

    pub fn upstreams(&self) -> &[Upstream]
    {   &self.upstreams
    }

    /// Call processors until one yields a result or attempts run out.
    /// On failure also returns the name of the last upstream tried.
    async fn forward_inner(
      &self
    , request: &LlmRequest
    ) -> Result<(String, ProcessResult), (String, crate::error::Error)>
    {   let mut sequence = UpstreamSequence::new(self.upstreams.len());
        let attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop
        {   let index = sequence.current().unwrap_or(0);
            let upstream = &self.upstreams[index];
            let name = upstream.name().to_string();
            debug!(
              "Forwarding to {} (attempt {}/{})",
              name, attempt + 1, attempts
            );

            // Bound the call here too, whatever the transport does
            let outcome = match tokio::time::timeout(
              upstream.timeout,
              upstream.transport.process(request, upstream.timeout)
            ).await
            {   Ok(outcome) => outcome
              , Err(_) => {
                  error!("{} timed out after {:?}", name, upstream.timeout);
                  Err(crate::error::Error::UpstreamTimeout
                  {   upstream: name.clone()
                    , timeout_ms: upstream.timeout.as_millis() as u64
                  })
                }
            };

            match outcome
            {   Ok(result) => return Ok((name, result))
              , Err(err) => {
                  attempt += 1;
                  if attempt >= attempts || !self.retry.is_retryable(&err)
                  {   return Err((name, err));
                  }
                  let backoff = self.retry.backoff_for_attempt(attempt - 1);
                  warn!(
                    "{} failed ({}); retrying in {:?}",
                    name, err, backoff
                  );
                  tokio::time::sleep(backoff).await;
                  sequence.advance();
                }
            }
        }
    }

    /// Forward one request; returns the answering upstream and its result
    pub async fn forward(
      &self
    , request: &LlmRequest
    ) -> Result<(String, ProcessResult), crate::error::Error>
    {   self.forward_inner(request).await.map_err(|(_, err)| err)
    }

    /// The proxy's test operation: forward and wrap
    pub async fn test(&self, request: LlmRequest) -> ProxyReply
    {   let start = Instant::now();
        let test_id = self.tracker.begin();
        info!("Starting test {}", test_id);

        match self.forward_inner(&request).await
        {   Ok((upstream, llm_response)) => {
              let duration = start.elapsed().as_secs_f64() * 1000.0;
              let status = llm_response.status;
              if status == ResultStatus::Success
              {   self.tracker.mark_completed();
                  info!(
                    "Test {} completed in {:.2}ms via {}",
                    test_id, duration, upstream
                  );
              } else
              {   self.tracker.mark_rejected();
                  info!(
                    "Test {} rejected by {}: {}",
                    test_id,
                    upstream,
                    llm_response.error.as_deref().unwrap_or("no detail")
                  );
              }
              ProxyReply::Completed(ProxyResponse
              {   test_id
                , upstream
                , llm_request: request
                , llm_response
                , status
                , timestamp: now_iso8601()
                , test_duration_ms: duration
              })
            }
          , Err((upstream, err)) => {
              self.tracker.mark_rejected();
              error!("Test {} failed: {}", test_id, err);
              ProxyReply::Failed(ErrorEnvelope
              {   test_id
                , status: ResultStatus::Error
                , error_kind: err.kind().to_string()
                , message: err.to_string()
                , upstream: Some(upstream)
                , upstream_status: err.upstream_status()
                , timestamp: now_iso8601()
              })
            }
        }
    }

    /// Proxy liveness plus processor reachability.
    /// Upstreams are checked concurrently, so the whole call is
    /// bounded by one health timeout.
    pub async fn health(&self) -> ProxyHealth
    {   debug!("Proxy health check");
        let mut checks = tokio::task::JoinSet::new();
        for (index, upstream) in self.upstreams.iter().enumerate()
        {   let upstream = upstream.clone();
            let timeout = self.health_timeout;
            checks.spawn(async move {
              (index, upstream_healthy(&upstream, timeout).await)
            });
        }

        let mut healthy = vec![false; self.upstreams.len()];
        while let Some(joined) = checks.join_next().await
        {   match joined
            {   Ok((index, ok)) => healthy[index] = ok
              , Err(e) => error!("Health check task failed: {}", e)
            }
        }

        let any_healthy = healthy.iter().any(|h| *h);
        let upstreams = self.upstreams
          .iter()
          .zip(healthy)
          .map(|(upstream, ok)| UpstreamHealth
          {   name: upstream.name().to_string()
            , status: health_word(ok).to_string()
          })
          .collect();
        ProxyHealth
        {   status: if any_healthy { "healthy" } else { "degraded" }
              .to_string()
          , timestamp: now_iso8601()
          , llm_service_status: health_word(any_healthy).to_string()
          , upstreams
        }
    }

    /// Models as reported by the first processor that answers;
    /// empty when none does.
    pub async fn supported_models(&self) -> ModelList
    {   for upstream in &self.upstreams
        {   let call = tokio::time::timeout(
              self.health_timeout,
              upstream.transport.supported_models(self.health_timeout)
            ).await;
            match call
            {   Ok(Ok(mut list)) => {
                  list.source = Some(LIST_SOURCE.to_string());
                  return list;
                }
              , Ok(Err(err)) => {
                  error!("Cannot list models on {}: {}", upstream.name(), err);
                }
              , Err(_) => {
                  error!("Listing models on {} timed out", upstream.name());
                }
            }
        }
        ModelList
        {   supported_models: vec![]
          , count: 0
          , source: Some(LIST_SOURCE.to_string())
        }
    }

    pub async fn supported_platforms(&self) -> PlatformList
    {   for upstream in &self.upstreams
        {   let call = tokio::time::timeout(
              self.health_timeout,
              upstream.transport.supported_platforms(self.health_timeout)
            ).await;
            match call
            {   Ok(Ok(mut list)) => {
                  list.source = Some(LIST_SOURCE.to_string());
                  return list;
                }
              , Ok(Err(err)) => {
                  error!(
                    "Cannot list platforms on {}: {}",
                    upstream.name(), err
                  );
                }
              , Err(_) => {
                  error!("Listing platforms on {} timed out", upstream.name());
                }
            }
        }
        PlatformList
        {   supported_platforms: vec![]
          , count: 0
          , source: Some(LIST_SOURCE.to_string())
        }
    }

    pub fn info(&self) -> ServiceInfo
    {   let mut endpoints = BTreeMap::new();
        for name in ["health", "test", "models", "platforms"]
        {   endpoints.insert(name.to_string(), format!("/{}", name));
        }
        ServiceInfo
        {   service: "LLM Test Service".to_string()
          , version: env!("CARGO_PKG_VERSION").to_string()
          , description: format!(
              "Forwards test requests to {}",
              self.upstreams
                .iter()
                .map(|u| u.name())
                .collect::<Vec<_>>()
                .join(", ")
            )
          , endpoints
        }
    }

    pub fn tracker(&self) -> &Arc<RequestTracker>
    {   &self.tracker
    }

    pub fn stats(&self) -> crate::tracker::TrackerStats
    {   self.tracker.stats()
    }
}

async fn upstream_healthy(upstream: &Upstream, timeout: Duration) -> bool
{   let check = tokio::time::timeout(
      timeout,
      upstream.transport.health(timeout)
    ).await;
    match check
    {   Ok(Ok(health)) => {
          debug!("{} reports {}", upstream.name(), health.status);
          health.status == "healthy"
        }
      , Ok(Err(err)) => {
          error!("Health check of {} failed: {}", upstream.name(), err);
          false
        }
      , Err(_) => {
          error!("Health check of {} timed out", upstream.name());
          false
        }
    }
}

fn health_word(healthy: bool) -> &'static str
{   if healthy { "healthy" } else { "unhealthy" }
}
