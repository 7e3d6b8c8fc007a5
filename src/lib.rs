pub mod error;
pub mod config;
pub mod logging;
pub mod request;
pub mod validation;
pub mod synthesis;
pub mod metadata;
pub mod tracker;
pub mod processor;
pub mod service;
pub mod transport;
pub mod retry;
pub mod proxy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use error::{Error, FieldViolation, ValidationError};
pub use processor::RequestProcessor;
pub use proxy::ProxyForwarder;
pub use request::{LlmRequest, ProcessResult, ResultStatus};
pub use service::ServiceBackend;
pub use tracker::RequestTracker;

/*

llmrelay simulates a uniform request/response contract for calling an
LLM on one of several backends, without running any inference.

Two halves:

  processor  validates a request, synthesizes a placeholder answer,
             computes metadata and returns a ProcessResult
  proxy      forwards the same request to a processor over the network
             and translates unreachable/slow upstreams into typed errors

  external caller -> ProxyForwarder -> ProcessorTransport
                  -> RequestProcessor -> ProcessResult -> back out

*/

/// SERVICE HANDLE API:

// ===== Process =====

pub type ProcessReply = Result<ProcessResult, crate::error::Error>;
pub type ProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<ProcessReply>;

pub struct ProcessArgs
{   pub request: LlmRequest
  , pub reply: ProcessReplySender
}

// ===== Health =====

pub type HealthReply
  = Result<request::HealthStatus, crate::error::Error>;
pub type HealthReplySender
  = tokio::sync::mpsc::UnboundedSender<HealthReply>;

pub struct HealthArgs
{   pub reply: HealthReplySender
}

// ===== GetModelList =====

pub type GetModelListReply
  = Result<request::ModelList, crate::error::Error>;
pub type GetModelListReplySender
  = tokio::sync::mpsc::UnboundedSender<GetModelListReply>;

pub struct GetModelListArgs
{   pub reply: GetModelListReplySender
}

// ===== GetPlatformList =====

pub type GetPlatformListReply
  = Result<request::PlatformList, crate::error::Error>;
pub type GetPlatformListReplySender
  = tokio::sync::mpsc::UnboundedSender<GetPlatformListReply>;

pub struct GetPlatformListArgs
{   pub reply: GetPlatformListReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== ServiceHand (sender side) =====

pub struct ServiceHand
{   pub process_tx
      : tokio::sync::mpsc::UnboundedSender<ProcessArgs>
  , pub health_tx
      : tokio::sync::mpsc::UnboundedSender<HealthArgs>
  , pub get_model_list_tx
      : tokio::sync::mpsc::UnboundedSender<GetModelListArgs>
  , pub get_platform_list_tx
      : tokio::sync::mpsc::UnboundedSender<GetPlatformListArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== ServiceFoot (receiver side) =====

pub struct ServiceFoot
{   pub process_rx
      : tokio::sync::mpsc::UnboundedReceiver<ProcessArgs>
  , pub health_rx
      : tokio::sync::mpsc::UnboundedReceiver<HealthArgs>
  , pub get_model_list_rx
      : tokio::sync::mpsc::UnboundedReceiver<GetModelListArgs>
  , pub get_platform_list_rx
      : tokio::sync::mpsc::UnboundedReceiver<GetPlatformListArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// LLMRELAY STRUCTURES:

/// Backend family a request targets.
/// Each variant is a hypothetical hosting platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform
{   /// Hugging Face Inference API
    HuggingFace
  , /// OpenAI API
    OpenAI
  , /// Local/self-hosted runtime
    Local
  , /// Ollama server
    Ollama
}

impl Platform
{   pub const ALL: [Platform; 4] = [
      Platform::HuggingFace
    , Platform::OpenAI
    , Platform::Local
    , Platform::Ollama
    ];

    pub fn as_str(&self) -> &'static str
    {   match self
        {   Platform::HuggingFace => "huggingface"
          , Platform::OpenAI => "openai"
          , Platform::Local => "local"
          , Platform::Ollama => "ollama"
        }
    }

    /// Short human description used in synthesized answers
    pub fn description(&self) -> &'static str
    {   match self
        {   Platform::HuggingFace => "Hugging Face inference endpoint"
          , Platform::OpenAI => "OpenAI-compatible API"
          , Platform::Local => "local offline runtime"
          , Platform::Ollama => "Ollama server"
        }
    }

    pub fn names() -> Vec<String>
    {   Platform::ALL.iter().map(|p| p.to_string()).collect()
    }
}

impl fmt::Display for Platform
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

impl FromStr for Platform
{   type Err = String;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   let wanted = s.trim().to_lowercase();
        Platform::ALL
          .iter()
          .copied()
          .find(|p| p.as_str() == wanted)
          .ok_or_else(|| format!("unknown platform '{}'", s))
    }
}

/// Model family within a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Model
{   Llama
  , DeepSeek
  , Gpt
  , Mistral
  , Phi
}

impl Model
{   pub const ALL: [Model; 5] = [
      Model::Llama
    , Model::DeepSeek
    , Model::Gpt
    , Model::Mistral
    , Model::Phi
    ];

    pub fn as_str(&self) -> &'static str
    {   match self
        {   Model::Llama => "llama"
          , Model::DeepSeek => "deepseek"
          , Model::Gpt => "gpt"
          , Model::Mistral => "mistral"
          , Model::Phi => "phi"
        }
    }

    /// Vendor behind the model family
    pub fn vendor(&self) -> &'static str
    {   match self
        {   Model::Llama => "Meta"
          , Model::DeepSeek => "DeepSeek"
          , Model::Gpt => "OpenAI"
          , Model::Mistral => "Mistral AI"
          , Model::Phi => "Microsoft"
        }
    }

    pub fn names() -> Vec<String>
    {   Model::ALL.iter().map(|m| m.to_string()).collect()
    }
}

impl fmt::Display for Model
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

impl FromStr for Model
{   type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   let wanted = s.trim().to_lowercase();
        Model::ALL
          .iter()
          .copied()
          .find(|m| m.as_str() == wanted)
          .ok_or_else(|| format!("unknown model '{}'", s))
    }
}
