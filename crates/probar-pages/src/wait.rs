//! Synchronous polling waits.
//!
//! A predicate is evaluated every `poll_interval_ms` until it returns `true` or
//! `timeout_ms` elapses. Waits block the calling thread and cannot be cancelled.

use crate::result::{PagesError, PagesResult};
use std::time::{Duration, Instant};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (60 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 60_000;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Polling interval for element-level waits (200ms)
pub const ELEMENT_POLL_INTERVAL_MS: u64 = 200;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of predicate evaluations
    pub attempts: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

// =============================================================================
// WAITER
// =============================================================================

/// Polls predicates with a fixed set of options
#[derive(Debug, Clone, Copy, Default)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a waiter with the given options
    #[must_use]
    pub const fn new(options: WaitOptions) -> Self {
        Self { options }
    }

    /// The options this waiter polls with
    #[must_use]
    pub const fn options(&self) -> WaitOptions {
        self.options
    }

    /// Poll `predicate` until it returns `Ok(true)`.
    ///
    /// Not-found and stale faults count as "not yet"; any other error aborts the
    /// wait immediately. The predicate is always evaluated at least once.
    pub fn until<F>(&self, description: &str, mut predicate: F) -> PagesResult<WaitResult>
    where
        F: FnMut() -> PagesResult<bool>,
    {
        let start = Instant::now();
        let timeout = self.options.timeout();
        let mut attempts = 0_u32;

        loop {
            attempts += 1;
            match predicate() {
                Ok(true) => {
                    return Ok(WaitResult {
                        elapsed: start.elapsed(),
                        attempts,
                        waited_for: description.to_string(),
                    })
                }
                Ok(false) => {}
                Err(e) if e.is_not_found() || matches!(e, PagesError::StaleElement { .. }) => {}
                Err(e) => return Err(e),
            }

            if start.elapsed() >= timeout {
                tracing::debug!(waited_for = description, attempts, "wait timed out");
                return Err(PagesError::Timeout {
                    ms: self.options.timeout_ms,
                    waited_for: description.to_string(),
                });
            }
            std::thread::sleep(self.options.poll_interval());
        }
    }

    /// Poll until `predicate` returns `Ok(false)`
    pub fn until_not<F>(&self, description: &str, mut predicate: F) -> PagesResult<WaitResult>
    where
        F: FnMut() -> PagesResult<bool>,
    {
        self.until(description, || predicate().map(|v| !v))
    }
}

/// Poll `predicate` with explicit timeout and interval
pub fn wait_until<F>(predicate: F, timeout_ms: u64, poll_interval_ms: u64) -> PagesResult<()>
where
    F: FnMut() -> PagesResult<bool>,
{
    Waiter::new(WaitOptions {
        timeout_ms,
        poll_interval_ms,
    })
    .until("condition", predicate)
    .map(|_| ())
}
