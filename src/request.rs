//! Wire types shared by the processor and the proxy

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current time as an ISO 8601 / RFC 3339 string
pub fn now_iso8601() -> String
{   Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Request as received from a caller.
/// Platform and model stay raw text until validation so that an
/// unknown value is reported as a validation failure, not a decode error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest
{   /// Contextual documents, code, notes
    #[serde(default)]
    pub artifacts: Vec<String>
  , /// Target platform name
    pub platform: String
  , /// Target model name
    pub model: String
  , /// Task instruction
    pub prompt: String
}

impl LlmRequest
{   pub fn new(
      artifacts: Vec<String>
    , platform: &str
    , model: &str
    , prompt: &str
    ) -> Self
    {   LlmRequest
        {   artifacts
          , platform: platform.to_string()
          , model: model.to_string()
          , prompt: prompt.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus
{   Success
  , Error
}

/// Derived description of a completed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata
{   pub platform_used: String
  , pub model_used: String
  , pub artifacts_count: usize
  , pub prompt_length: usize
  , pub response_length: usize
}

/// Outcome of one process call.
/// Success carries response_text and metadata; error carries the
/// message and offending fields and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult
{   pub request_id: String
  , pub status: ResultStatus
  , pub response_text: Option<String>
  , pub metadata: Option<ResultMetadata>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>
  , #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid_fields: Vec<String>
  , pub timestamp: String
  , pub processing_time_ms: f64
}

impl ProcessResult
{   pub fn is_success(&self) -> bool
    {   self.status == ResultStatus::Success
    }
}

/// Processor liveness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus
{   pub status: String
  , pub timestamp: String
  , pub version: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelList
{   pub supported_models: Vec<String>
  , pub count: usize
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformList
{   pub supported_platforms: Vec<String>
  , pub count: usize
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>
}

/// Root description of a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo
{   pub service: String
  , pub version: String
  , pub description: String
  , pub endpoints: BTreeMap<String, String>
}

// ===== Proxy envelopes =====

/// Proxy answer when a processor produced a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyResponse
{   pub test_id: String
  , /// Name of the upstream that answered
    pub upstream: String
  , pub llm_request: LlmRequest
  , /// Relayed verbatim
    pub llm_response: ProcessResult
  , /// Mirrors llm_response.status
    pub status: ResultStatus
  , pub timestamp: String
  , pub test_duration_ms: f64
}

/// Proxy answer when no result could be obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope
{   pub test_id: String
  , pub status: ResultStatus
  , /// upstream_unavailable, upstream_timeout, ...
    pub error_kind: String
  , pub message: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>
  , /// Status the processor answered with, when it answered at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>
  , pub timestamp: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProxyReply
{   Completed(ProxyResponse)
  , Failed(ErrorEnvelope)
}

impl ProxyReply
{   /// HTTP-style status a hosting server should answer with
    pub fn status_code(&self) -> u16
    {   match self
        {   ProxyReply::Completed(resp) => {
              if resp.status == ResultStatus::Success { 200 } else { 400 }
            }
          , ProxyReply::Failed(env) => {
              // Client-side rejections by the processor keep their status
              if let Some(status) = env.upstream_status
              {   if (400..500).contains(&status)
                  {   return status;
                  }
              }
              match env.error_kind.as_str()
              {   "upstream_unavailable" => 503
                , "upstream_timeout" => 504
                , "upstream_error" | "parse_error" => 502
                , _ => 500
              }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamHealth
{   pub name: String
  , pub status: String
}

/// Proxy liveness plus reachability of the processors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyHealth
{   /// healthy when at least one processor answers, degraded otherwise
    pub status: String
  , pub timestamp: String
  , pub llm_service_status: String
  , pub upstreams: Vec<UpstreamHealth>
}
