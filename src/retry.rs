//! Bounded retry policy and upstream failover order for the proxy

use std::time::Duration;
use log::debug;

use crate::config::{RetryConfig, MAX_RETRIES};

/// Longest single wait between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry policy for unreachable upstreams
#[derive(Debug, Clone)]
pub struct RetryPolicy
{   pub max_retries: usize
  , pub backoff_multiplier: f32
  , pub initial_backoff: Duration
}

impl RetryPolicy
{   /// Create a new retry policy; retries are capped at MAX_RETRIES
    pub fn new(
      max_retries: usize
    , backoff_multiplier: f32
    , initial_backoff_ms: u64
    ) -> Self
    {   RetryPolicy
        {   max_retries: max_retries.min(MAX_RETRIES)
          , backoff_multiplier
          , initial_backoff: Duration::from_millis(
              initial_backoff_ms
            )
        }
    }

    /// One attempt, no retries
    pub fn none() -> Self
    {   RetryPolicy::new(0, 1.0, 0)
    }

    pub fn from_config(config: &RetryConfig) -> Self
    {   if !config.enabled
        {   return RetryPolicy::none();
        }
        RetryPolicy::new(
          config.max_retries,
          config.backoff_multiplier,
          config.initial_backoff_ms
        )
    }

    /// Total calls allowed, first one included
    pub fn max_attempts(&self) -> usize
    {   self.max_retries.saturating_add(1)
    }

    /// Calculate backoff duration before retry number `attempt` (0-based)
    pub fn backoff_for_attempt(
      &self
    , attempt: usize
    ) -> Duration
    {   debug!("Calculating backoff for attempt {}", attempt);
        let exponent = attempt.min(MAX_RETRIES) as i32;
        let multiplier
          = self.backoff_multiplier.max(1.0).powi(exponent);
        let millis
          = self.initial_backoff.as_millis() as f64 * multiplier as f64;
        if !millis.is_finite() || millis >= MAX_BACKOFF.as_millis() as f64
        {   return MAX_BACKOFF;
        }
        Duration::from_millis(millis as u64)
    }

    /// Only failures where the request never reached a processor
    /// are worth repeating.
    pub fn is_retryable(&self, err: &crate::error::Error) -> bool
    {   matches!(err, crate::error::Error::UpstreamUnavailable(_))
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::none()
    }
}

/// Upstream indices in failover order
#[derive(Debug, Clone)]
pub struct UpstreamSequence
{   pub len: usize
  , pub current_index: usize
}

impl UpstreamSequence
{   /// Create a new upstream sequence
    pub fn new(len: usize) -> Self
    {   debug!("Creating upstream sequence with {} upstreams", len);
        UpstreamSequence
        {   len
          , current_index: 0
        }
    }

    /// Get the current upstream index
    pub fn current(&self) -> Option<usize>
    {   if self.len == 0
        {   None
        } else
        {   Some(self.current_index % self.len)
        }
    }

    /// Move to the next upstream, wrapping around
    pub fn advance(&mut self) -> Option<usize>
    {   self.current_index += 1;
        self.current()
    }

    /// Reset to the first upstream
    pub fn reset(&mut self)
    {   debug!("Resetting upstream sequence");
        self.current_index = 0;
    }
}
