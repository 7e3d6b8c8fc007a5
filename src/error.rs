use std::fmt;

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation
{   pub field: &'static str
  , pub reason: String
}

/// Every constraint a request broke, in field order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError
{   pub violations: Vec<FieldViolation>
}

impl ValidationError
{   pub fn new() -> Self
    {   ValidationError::default()
    }

    pub fn push(
      &mut self
    , field: &'static str
    , reason: impl Into<String>
    )
    {   self.violations.push(FieldViolation
        {   field
          , reason: reason.into()
        });
    }

    pub fn is_empty(&self) -> bool
    {   self.violations.is_empty()
    }

    /// Names of the offending fields, without duplicates
    pub fn fields(&self) -> Vec<&'static str>
    {   let mut fields: Vec<&'static str> = Vec::new();
        for violation in &self.violations
        {   if !fields.contains(&violation.field)
            {   fields.push(violation.field);
            }
        }
        fields
    }

    pub fn has_field(&self, field: &str) -> bool
    {   self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationError
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   if self.violations.is_empty()
        {   return write!(f, "invalid request");
        }
        let parts: Vec<String> = self.violations
          .iter()
          .map(|v| format!("{}: {}", v.field, v.reason))
          .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Custom error type for llmrelay operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq)]
pub enum Error
{   /// Request rejected before synthesis
    Validation(ValidationError)
  , /// Processor could not be reached (refused, DNS, reset)
    UpstreamUnavailable(String)
  , /// Processor did not answer within the timeout
    UpstreamTimeout
    {   upstream: String
      , timeout_ms: u64
    }
  , /// Processor answered with something other than a result
    UpstreamError
    {   status: u16
      , message: String
    }
  , /// Failed to parse a payload
    ParseError(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Defect inside the processor, surfaced as a 500-class outcome
    Internal(String)
  , /// Generic error
    Other(String)
}

impl Error
{   /// Stable code used in error envelopes
    pub fn kind(&self) -> &'static str
    {   match self
        {   Error::Validation(_) => "validation_error"
          , Error::UpstreamUnavailable(_) => "upstream_unavailable"
          , Error::UpstreamTimeout { .. } => "upstream_timeout"
          , Error::UpstreamError { .. } => "upstream_error"
          , Error::ParseError(_) => "parse_error"
          , Error::InvalidConfiguration(_) => "invalid_configuration"
          , Error::Internal(_) => "internal_error"
          , Error::Other(_) => "error"
        }
    }

    /// Status the processor itself answered with, if any
    pub fn upstream_status(&self) -> Option<u16>
    {   match self
        {   Error::UpstreamError { status, .. } => Some(*status)
          , _ => None
        }
    }

    /// HTTP-style status a hosting server should answer with
    pub fn status_code(&self) -> u16
    {   match self
        {   Error::Validation(_) => 400
          , Error::UpstreamUnavailable(_) => 503
          , Error::UpstreamTimeout { .. } => 504
          , Error::UpstreamError { status, .. } => {
              if (400..500).contains(status) { *status } else { 502 }
            }
          , Error::ParseError(_) => 502
          , Error::InvalidConfiguration(_)
          | Error::Internal(_)
          | Error::Other(_) => 500
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Validation(err) => {
              write!(f, "Invalid request: {}", err)
            }
          , Error::UpstreamUnavailable(msg) => {
              write!(f, "LLM service unavailable: {}", msg)
            }
          , Error::UpstreamTimeout { upstream, timeout_ms } => {
              write!(f,
                "LLM service {} did not respond within {}ms",
                upstream,
                timeout_ms
              )
            }
          , Error::UpstreamError { status, message } => {
              write!(f,
                "LLM service error ({}): {}",
                status,
                message
              )
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Internal(msg) => {
              write!(f, "Internal server error: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ValidationError> for Error
{   fn from(err: ValidationError) -> Self
    {   Error::Validation(err)
    }
}

impl From<serde_json::Error> for Error
{   fn from(err: serde_json::Error) -> Self
    {   Error::ParseError(err.to_string())
    }
}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}
