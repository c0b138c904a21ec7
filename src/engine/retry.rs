use std::time::Duration;

use crate::suite::RetryPolicy;

/// Status recorded for an attempt that never got an HTTP response.
pub const NETWORK_FAILURE_STATUS: u16 = 599;
/// Status synthesized for a simulated rate limit.
pub const RATE_LIMITED_STATUS: u16 = 429;

/// Whether a status asks the client to try again.
#[must_use]
pub const fn is_retriable(status: u16) -> bool {
    status == RATE_LIMITED_STATUS || status >= 500
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Attempt number `attempt` (zero-based) should run now.
    Attempting { attempt: u32 },
    /// Pause for `delay` before attempt `next_attempt`.
    Waiting { next_attempt: u32, delay: Duration },
    Done,
}

/// Retry decisions for one repeat, free of I/O and timers.
///
/// The executor performs the attempt or the pause each state asks for and
/// feeds results back in.
#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    retry_network_errors: bool,
    state: RetryState,
}

impl RetryMachine {
    #[must_use]
    pub const fn new(policy: RetryPolicy, retry_network_errors: bool) -> Self {
        Self {
            policy,
            retry_network_errors,
            state: RetryState::Attempting { attempt: 0 },
        }
    }

    #[must_use]
    pub const fn state(&self) -> RetryState {
        self.state
    }

    /// Records the status of the attempt that just ran.
    pub fn record(&mut self, status: u16) -> RetryState {
        let RetryState::Attempting { attempt } = self.state else {
            return self.state;
        };
        let next_attempt = attempt.saturating_add(1);
        self.state = if self.should_retry(status) && next_attempt < self.policy.max_attempts.get()
        {
            RetryState::Waiting {
                next_attempt,
                delay: Duration::from_millis(self.policy.base_delay_ms),
            }
        } else {
            RetryState::Done
        };
        self.state
    }

    /// Moves on once the pause requested by `Waiting` has elapsed.
    pub fn resume(&mut self) -> RetryState {
        if let RetryState::Waiting { next_attempt, .. } = self.state {
            self.state = RetryState::Attempting {
                attempt: next_attempt,
            };
        }
        self.state
    }

    pub fn finish(&mut self) {
        self.state = RetryState::Done;
    }

    const fn should_retry(&self, status: u16) -> bool {
        if status == NETWORK_FAILURE_STATUS {
            return self.retry_network_errors;
        }
        is_retriable(status)
    }
}
