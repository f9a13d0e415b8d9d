//! Retry wire.
//!
//! # Responsibilities
//! - Re-run the inner chain on transport failures
//! - Re-run on a configured set of retryable statuses (5xx by default)
//! - Stop after a fixed number of attempts and surface the last outcome
//!
//! # Design Decisions
//! - Anything other than `WireError::Transport` is final and returned at once
//! - A retryable status that survives every attempt is returned as a normal
//!   response, not converted into an error
//! - Backoff is optional and off by default; when enabled it is exponential
//!   with up to 10% jitter

use std::time::Duration;

use rand::Rng;

use crate::error::WireError;
use crate::http::{HttpRequest, HttpResponse};
use crate::wire::Wire;

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

pub struct RetryWire {
    next: Box<dyn Wire>,
    attempts: u32,
    statuses: Vec<u16>,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl RetryWire {
    pub fn new(next: Box<dyn Wire>) -> Self {
        Self {
            next,
            attempts: DEFAULT_ATTEMPTS,
            statuses: DEFAULT_RETRY_STATUSES.to_vec(),
            backoff_base: Duration::ZERO,
            backoff_max: Duration::ZERO,
        }
    }

    /// Total attempts, including the first one. Clamped to at least 1.
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Statuses that trigger another attempt.
    pub fn statuses(mut self, statuses: &[u16]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    fn pause(&self, attempt: u32) {
        let delay = calculate_backoff(attempt, self.backoff_base, self.backoff_max);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

impl Wire for RetryWire {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, WireError> {
        let mut attempt = 1;
        loop {
            match self.next.execute(request) {
                Ok(response) if self.statuses.contains(&response.status()) => {
                    if attempt >= self.attempts {
                        return Ok(response);
                    }
                    tracing::warn!(
                        uri = request.uri(),
                        attempt,
                        status = response.status(),
                        "retrying request"
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() => {
                    if attempt >= self.attempts {
                        tracing::warn!(uri = request.uri(), attempts = attempt, error = %e, "retry budget exhausted");
                        return Err(e);
                    }
                    tracing::warn!(uri = request.uri(), attempt, error = %e, "retrying after transport error");
                }
                Err(e) => return Err(e),
            }
            self.pause(attempt);
            attempt += 1;
        }
    }
}

/// Exponential backoff with jitter for the pause after `attempt` (1-based).
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 || base.is_zero() {
        return Duration::ZERO;
    }

    let base_ms = base.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt - 1));
    let capped = delay_ms.min(max_ms.max(base_ms));

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
