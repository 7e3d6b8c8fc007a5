//! Metadata derived from a validated request and its response

use crate::request::ResultMetadata;
use crate::validation::ValidatedRequest;

/// Lengths are counted in characters, not bytes
pub fn build_metadata(
  request: &ValidatedRequest
, response_text: &str
) -> ResultMetadata
{   ResultMetadata
    {   platform_used: request.platform().to_string()
      , model_used: request.model().to_string()
      , artifacts_count: request.artifacts().len()
      , prompt_length: request.prompt().chars().count()
      , response_length: response_text.chars().count()
    }
}
