//! Request identifiers and counters, shared by concurrent requests

use std::sync::atomic::{AtomicU64, Ordering};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Point-in-time view of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackerStats
{   pub received: u64
  , pub completed: u64
  , pub rejected: u64
}

/// Hands out unique ids and counts request outcomes.
/// Owned by whoever builds the processor and passed in,
/// so its lifetime is the caller's to decide.
#[derive(Debug)]
pub struct RequestTracker
{   prefix: String
  , received: AtomicU64
  , completed: AtomicU64
  , rejected: AtomicU64
}

impl RequestTracker
{   /// Ids look like `req_<uuid>`
    pub fn new() -> Self
    {   RequestTracker::with_prefix("req")
    }

    pub fn with_prefix(prefix: &str) -> Self
    {   debug!("Creating RequestTracker with prefix {}", prefix);
        RequestTracker
        {   prefix: prefix.to_string()
          , received: AtomicU64::new(0)
          , completed: AtomicU64::new(0)
          , rejected: AtomicU64::new(0)
        }
    }

    /// Register a new request and return its id
    pub fn begin(&self) -> String
    {   self.received.fetch_add(1, Ordering::Relaxed);
        self.next_id()
    }

    /// A fresh id without touching the counters
    pub fn next_id(&self) -> String
    {   format!("{}_{}", self.prefix, Uuid::new_v4().simple())
    }

    pub fn mark_completed(&self)
    {   self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_rejected(&self)
    {   self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> TrackerStats
    {   TrackerStats
        {   received: self.received.load(Ordering::Relaxed)
          , completed: self.completed.load(Ordering::Relaxed)
          , rejected: self.rejected.load(Ordering::Relaxed)
        }
    }

    /// Zero the counters; ids are unaffected
    pub fn reset(&self)
    {   debug!("Resetting RequestTracker counters");
        self.received.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
    }
}

impl Default for RequestTracker
{   fn default() -> Self
    {   RequestTracker::new()
    }
}
