//! Cache module for memoizing Canvas API responses
//!
//! This module provides a process-wide, in-memory cache that wraps arbitrary
//! asynchronous fetches with a time-to-live. Expired entries behave exactly like
//! missing ones, and failed fetches are never stored, so the next call retries.

mod clock;
mod manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{cache_key, ResponseCache, DEFAULT_TTL_SECS};
