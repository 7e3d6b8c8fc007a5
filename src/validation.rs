//! Request validation, the only gate before synthesis

use log::{debug, trace};

use crate::config::RequestLimits;
use crate::error::ValidationError;
use crate::request::LlmRequest;
use crate::{Model, Platform};

/// A request that passed validation.
/// Only constructible through [`validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest
{   artifacts: Vec<String>
  , platform: Platform
  , model: Model
  , prompt: String
}

impl ValidatedRequest
{   pub fn artifacts(&self) -> &[String]
    {   &self.artifacts
    }

    pub fn platform(&self) -> Platform
    {   self.platform
    }

    pub fn model(&self) -> Model
    {   self.model
    }

    pub fn prompt(&self) -> &str
    {   &self.prompt
    }
}

/// Check every field and report all violations at once
pub fn validate(
  request: &LlmRequest
, limits: &RequestLimits
) -> Result<ValidatedRequest, ValidationError>
{   debug!(
      "Validating request: platform={} model={} artifacts={}",
      request.platform,
      request.model,
      request.artifacts.len()
    );
    let mut err = ValidationError::new();

    let platform = match request.platform.parse::<Platform>()
    {   Ok(p) => Some(p)
      , Err(_) => {
          err.push(
            "platform",
            format!(
              "platform '{}' is not supported; supported platforms: {}",
              request.platform,
              Platform::names().join(", ")
            )
          );
          None
        }
    };

    let model = match request.model.parse::<Model>()
    {   Ok(m) => Some(m)
      , Err(_) => {
          err.push(
            "model",
            format!(
              "model '{}' is not supported; supported models: {}",
              request.model,
              Model::names().join(", ")
            )
          );
          None
        }
    };

    if request.prompt.trim().is_empty()
    {   err.push("prompt", "prompt must not be empty");
    } else
    {   let chars = request.prompt.chars().count();
        if chars > limits.max_prompt_chars
        {   err.push(
              "prompt",
              format!(
                "prompt has {} characters; the limit is {}",
                chars, limits.max_prompt_chars
              )
            );
        }
    }

    if request.artifacts.len() > limits.max_artifacts
    {   err.push(
          "artifacts",
          format!(
            "{} artifacts supplied; the limit is {}",
            request.artifacts.len(),
            limits.max_artifacts
          )
        );
    }
    for (i, artifact) in request.artifacts.iter().enumerate()
    {   let chars = artifact.chars().count();
        if chars > limits.max_artifact_chars
        {   err.push(
              "artifacts",
              format!(
                "artifact {} has {} characters; the limit is {}",
                i + 1, chars, limits.max_artifact_chars
              )
            );
        }
    }

    match (platform, model)
    {   (Some(platform), Some(model)) if err.is_empty() => {
          trace!("Request valid: {}/{}", platform, model);
          Ok(ValidatedRequest
          {   artifacts: request.artifacts.clone()
            , platform
            , model
            , prompt: request.prompt.clone()
          })
        }
      , _ => {
          debug!("Request invalid: {}", err);
          Err(err)
        }
    }
}
