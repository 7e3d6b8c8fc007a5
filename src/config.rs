//! Configuration for the request processor and the proxy

use serde::{Deserialize, Serialize};
use log::{debug, error, warn};
use std::path::Path;
use std::time::Duration;

/// Address used when nothing else is configured
pub const DEFAULT_LLM_SERVICE_URL: &str = "http://llm-service:8000";

/// Environment variable overriding the primary upstream address
pub const LLM_SERVICE_URL_ENV: &str = "LLM_SERVICE_URL";

/// Upper bound on proxy retries after the first attempt
pub const MAX_RETRIES: usize = 10;

/// Size bounds applied by the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLimits
{   /// Max number of artifacts per request
    pub max_artifacts: usize
  , /// Max characters in a single artifact
    pub max_artifact_chars: usize
  , /// Max characters in the prompt
    pub max_prompt_chars: usize
}

impl Default for RequestLimits
{   fn default() -> Self
    {   RequestLimits
        {   max_artifacts: 64
          , max_artifact_chars: 100_000
          , max_prompt_chars: 32_000
        }
    }
}

/// Request processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig
{   /// Service name reported by the info operation
    pub service_name: String
  , /// Version reported by health and info
    pub version: String
  , /// Validator bounds
    #[serde(default)]
    pub limits: RequestLimits
}

impl Default for ProcessorConfig
{   fn default() -> Self
    {   ProcessorConfig
        {   service_name: "LLM Microservice".to_string()
          , version: env!("CARGO_PKG_VERSION").to_string()
          , limits: RequestLimits::default()
        }
    }
}

/// One reachable request processor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig
{   /// Name reported back as the answering instance
    pub name: String
  , /// Base URL, e.g. http://llm-service:8000
    pub base_url: String
  , /// Timeout for a process call in milliseconds
    pub timeout_ms: Option<u64>
}

impl UpstreamConfig
{   pub fn new(name: &str, base_url: &str) -> Self
    {   UpstreamConfig
        {   name: name.to_string()
          , base_url: base_url.to_string()
          , timeout_ms: None
        }
    }
}

/// Retry configuration for the proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig
{   /// Enable retries on unreachable upstreams
    pub enabled: bool
  , /// Max retry attempts after the first call
    pub max_retries: usize
  , /// Backoff multiplier for retries
    pub backoff_multiplier: f32
  , /// Initial backoff duration in milliseconds
    pub initial_backoff_ms: u64
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   enabled: false
          , max_retries: 2
          , backoff_multiplier: 2.0
          , initial_backoff_ms: 100
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig
{   /// Processors in failover order
    pub upstreams: Vec<UpstreamConfig>
  , /// Default timeout for process calls in milliseconds
    pub request_timeout_ms: u64
  , /// Timeout for health and list calls in milliseconds
    pub health_timeout_ms: u64
  , /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig
}

impl Default for ProxyConfig
{   fn default() -> Self
    {   ProxyConfig
        {   upstreams: vec![
              UpstreamConfig::new("llm-service", DEFAULT_LLM_SERVICE_URL)
            ]
          , request_timeout_ms: 30_000
          , health_timeout_ms: 5_000
          , retry: RetryConfig::default()
        }
    }
}

impl ProxyConfig
{   /// Parse a JSON configuration document
    pub fn from_json_str(json: &str)
      -> Result<Self, crate::error::Error>
    {   debug!("Parsing proxy configuration");
        let config: ProxyConfig = serde_json::from_str(json)
          .map_err(|e| {
            error!("Bad proxy configuration: {}", e);
            crate::error::Error::InvalidConfiguration(e.to_string())
          })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>)
      -> Result<Self, crate::error::Error>
    {   let path = path.as_ref();
        debug!("Loading proxy configuration from {}", path.display());
        let text = std::fs::read_to_string(path)
          .map_err(|e| {
            error!("Cannot read {}: {}", path.display(), e);
            crate::error::Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        ProxyConfig::from_json_str(&text)
    }

    /// Replace the primary upstream address with LLM_SERVICE_URL if set
    pub fn with_env_overrides(self) -> Self
    {   match std::env::var(LLM_SERVICE_URL_ENV)
        {   Ok(url) => self.with_primary_url(&url)
          , Err(_) => self
        }
    }

    /// Replace (or create) the first upstream's address
    pub fn with_primary_url(mut self, url: &str) -> Self
    {   let url = url.trim().to_string();
        debug!("Primary upstream set to {}", url);
        match self.upstreams.first_mut()
        {   Some(first) => first.base_url = url
          , None => {
              self.upstreams.push(
                UpstreamConfig::new("llm-service", &url)
              );
            }
        }
        self
    }

    /// Effective timeout for one upstream
    pub fn timeout_for(&self, upstream: &UpstreamConfig) -> Duration
    {   Duration::from_millis(
          upstream.timeout_ms.unwrap_or(self.request_timeout_ms)
        )
    }

    pub fn health_timeout(&self) -> Duration
    {   Duration::from_millis(self.health_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   if self.upstreams.is_empty()
        {   error!("No upstreams configured");
            return Err(crate::error::Error::InvalidConfiguration(
              "at least one upstream is required".to_string()
            ));
        }
        if self.request_timeout_ms == 0 || self.health_timeout_ms == 0
        {   error!("Zero timeout configured");
            return Err(crate::error::Error::InvalidConfiguration(
              "timeouts must be greater than zero".to_string()
            ));
        }
        for upstream in &self.upstreams
        {   if upstream.timeout_ms == Some(0)
            {   return Err(crate::error::Error::InvalidConfiguration(
                  format!("upstream {} has a zero timeout", upstream.name)
                ));
            }
            let url = upstream.base_url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://"))
            {   error!("Upstream {} has bad URL {}", upstream.name, url);
                return Err(crate::error::Error::InvalidConfiguration(
                  format!(
                    "upstream {} base_url must be http(s): {}",
                    upstream.name, url
                  )
                ));
            }
        }
        if self.retry.max_retries > MAX_RETRIES
        {   error!("max_retries {} too high", self.retry.max_retries);
            return Err(crate::error::Error::InvalidConfiguration(
              format!(
                "max_retries must be at most {}, got {}",
                MAX_RETRIES, self.retry.max_retries
              )
            ));
        }
        if !self.retry.backoff_multiplier.is_finite()
          || self.retry.backoff_multiplier < 0.0
        {   warn!(
              "backoff_multiplier {} ignored; backoff stays flat",
              self.retry.backoff_multiplier
            );
        }
        Ok(())
    }
}
