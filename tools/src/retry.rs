//! Retry state machine for the resilient request engine
//!
//! The retry loop is modelled as explicit states with a pure transition
//! function, so the policy can be tested without any network I/O:
//!
//! ```text
//!               Succeeded ─────────────────────────────► Succeeded
//!  Attempting ─ ClientError(4xx) ───────────────────────► Abandoned
//!      ▲      ─ TimedOut / Failed ─┬─ budget left ──────► WaitingBackoff
//!      │                           └─ budget exhausted ─► ExhaustedRetries
//!      └────────────── BackoffElapsed ◄──────────────────── WaitingBackoff
//! ```
//!
//! A timed-out attempt multiplies the timeout of the next attempt by the
//! configured factor (uncapped). Other retryable failures keep the timeout.
//! Retry `n` (starting at 1) waits `backoff_base * 2^n`.

use crate::config::RequestConfig;
use crate::policy::RequestPolicy;
use std::time::Duration;

/// State of one request's retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// An attempt is about to run (or running)
    Attempting {
        /// Zero-based attempt index; attempt `n > 0` is retry number `n`
        attempt: u32,
        /// Timeout for this attempt
        timeout: Duration,
    },

    /// Sleeping before the next retry
    WaitingBackoff {
        /// Retry number that follows the wait (starting at 1)
        retry: u32,
        /// Wait duration
        delay: Duration,
        /// Timeout the retry will use
        timeout: Duration,
    },

    /// A response was received and parsed
    Succeeded,

    /// The retry budget is spent
    ExhaustedRetries,

    /// A client error made further attempts pointless
    Abandoned {
        /// HTTP status that caused the abandonment
        status: u16,
    },
}

impl RetryState {
    /// Whether the loop has finished
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::ExhaustedRetries | Self::Abandoned { .. }
        )
    }
}

/// Inputs driving the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    /// The attempt produced a usable payload
    Succeeded,
    /// The attempt exceeded its timeout
    TimedOut,
    /// The server answered with a 4xx status
    ClientError(u16),
    /// Server error, network fault or malformed body
    Failed,
    /// The backoff wait has elapsed
    BackoffElapsed,
}

/// Retry schedule for one request: its policy plus escalation settings
#[derive(Debug, Clone, Copy)]
pub struct RetrySchedule {
    policy: RequestPolicy,
    timeout_multiplier: f64,
    backoff_base: Duration,
}

impl RetrySchedule {
    /// Build a schedule from a classified policy and the engine config
    #[must_use]
    pub const fn new(policy: RequestPolicy, config: &RequestConfig) -> Self {
        Self {
            policy,
            timeout_multiplier: config.timeout_multiplier,
            backoff_base: config.backoff_base,
        }
    }

    /// Policy this schedule enforces
    #[must_use]
    pub const fn policy(&self) -> &RequestPolicy {
        &self.policy
    }

    /// Initial state: first attempt at the policy timeout
    #[must_use]
    pub const fn start(&self) -> RetryState {
        RetryState::Attempting {
            attempt: 0,
            timeout: self.policy.timeout,
        }
    }

    /// Wait before retry number `retry` (1-based)
    #[must_use]
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(retry))
    }

    /// Pure transition from `(state, event)` to the next state
    ///
    /// Events that do not apply to the current state leave it unchanged.
    #[must_use]
    pub fn transition(&self, state: RetryState, event: RetryEvent) -> RetryState {
        match (state, event) {
            (RetryState::Attempting { .. }, RetryEvent::Succeeded) => RetryState::Succeeded,
            (RetryState::Attempting { .. }, RetryEvent::ClientError(status)) => {
                RetryState::Abandoned { status }
            }
            (RetryState::Attempting { attempt, timeout }, RetryEvent::TimedOut) => {
                self.after_failure(attempt, self.escalate(timeout))
            }
            (RetryState::Attempting { attempt, timeout }, RetryEvent::Failed) => {
                self.after_failure(attempt, timeout)
            }
            (RetryState::WaitingBackoff { retry, timeout, .. }, RetryEvent::BackoffElapsed) => {
                RetryState::Attempting {
                    attempt: retry,
                    timeout,
                }
            }
            (state, _) => state,
        }
    }

    fn after_failure(&self, attempt: u32, next_timeout: Duration) -> RetryState {
        if attempt >= self.policy.max_retries {
            RetryState::ExhaustedRetries
        } else {
            let retry = attempt + 1;
            RetryState::WaitingBackoff {
                retry,
                delay: self.backoff_delay(retry),
                timeout: next_timeout,
            }
        }
    }

    fn escalate(&self, timeout: Duration) -> Duration {
        Duration::try_from_secs_f64(timeout.as_secs_f64() * self.timeout_multiplier)
            .unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Test code can use expect
mod tests {
    use super::*;
    use crate::policy::classify;

    const SLOW_URL: &str = "http://backend/api/search";
    const FAST_URL: &str = "http://api.weatherapi.com/v1/current.json";

    fn schedule(url: &str) -> RetrySchedule {
        RetrySchedule::new(classify(url), &RequestConfig::default())
    }

    /// Drive the machine, feeding `outcomes` to attempts and eliding waits.
    /// Returns the visited states.
    fn run(schedule: &RetrySchedule, outcomes: &[RetryEvent]) -> Vec<RetryState> {
        let mut trace = vec![schedule.start()];
        let mut outcomes = outcomes.iter();
        let mut state = schedule.start();

        while !state.is_terminal() {
            state = match state {
                RetryState::WaitingBackoff { .. } => {
                    schedule.transition(state, RetryEvent::BackoffElapsed)
                }
                _ => {
                    let event = *outcomes.next().expect("ran out of outcomes");
                    schedule.transition(state, event)
                }
            };
            trace.push(state);
        }
        trace
    }

    fn attempts(trace: &[RetryState]) -> Vec<Duration> {
        trace
            .iter()
            .filter_map(|state| match state {
                RetryState::Attempting { timeout, .. } => Some(*timeout),
                _ => None,
            })
            .collect()
    }

    fn delays(trace: &[RetryState]) -> Vec<Duration> {
        trace
            .iter()
            .filter_map(|state| match state {
                RetryState::WaitingBackoff { delay, .. } => Some(*delay),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_success_on_first_attempt() {
        let trace = run(&schedule(SLOW_URL), &[RetryEvent::Succeeded]);

        assert_eq!(attempts(&trace).len(), 1);
        assert_eq!(trace.last(), Some(&RetryState::Succeeded));
    }

    #[test]
    fn test_server_errors_exhaust_slow_budget() {
        let trace = run(&schedule(SLOW_URL), &[RetryEvent::Failed; 4]);

        assert_eq!(attempts(&trace).len(), 4);
        assert_eq!(trace.last(), Some(&RetryState::ExhaustedRetries));
    }

    #[test]
    fn test_backoff_doubles_from_two_seconds() {
        let trace = run(&schedule(SLOW_URL), &[RetryEvent::Failed; 4]);

        assert_eq!(
            delays(&trace),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }

    #[test]
    fn test_timeouts_escalate_by_half() {
        let trace = run(&schedule(SLOW_URL), &[RetryEvent::TimedOut; 4]);

        assert_eq!(
            attempts(&trace),
            vec![
                Duration::from_secs(120),
                Duration::from_secs(180),
                Duration::from_secs(270),
                Duration::from_secs(405)
            ]
        );
        assert_eq!(trace.last(), Some(&RetryState::ExhaustedRetries));
    }

    #[test]
    fn test_plain_failures_keep_timeout() {
        let trace = run(
            &schedule(SLOW_URL),
            &[RetryEvent::Failed, RetryEvent::TimedOut, RetryEvent::Succeeded],
        );

        assert_eq!(
            attempts(&trace),
            vec![
                Duration::from_secs(120),
                Duration::from_secs(120),
                Duration::from_secs(180)
            ]
        );
        assert_eq!(trace.last(), Some(&RetryState::Succeeded));
    }

    #[test]
    fn test_client_error_abandons_despite_budget() {
        let trace = run(&schedule(SLOW_URL), &[RetryEvent::ClientError(404)]);

        assert_eq!(attempts(&trace).len(), 1);
        assert_eq!(trace.last(), Some(&RetryState::Abandoned { status: 404 }));
    }

    #[test]
    fn test_client_error_after_retry() {
        let trace = run(
            &schedule(SLOW_URL),
            &[RetryEvent::Failed, RetryEvent::ClientError(401)],
        );

        assert_eq!(attempts(&trace).len(), 2);
        assert_eq!(trace.last(), Some(&RetryState::Abandoned { status: 401 }));
    }

    #[test]
    fn test_fast_endpoint_single_attempt() {
        let trace = run(&schedule(FAST_URL), &[RetryEvent::Failed]);

        assert_eq!(attempts(&trace).len(), 1);
        assert!(delays(&trace).is_empty());
        assert_eq!(trace.last(), Some(&RetryState::ExhaustedRetries));
    }

    #[test]
    fn test_irrelevant_events_leave_state_unchanged() {
        let schedule = schedule(SLOW_URL);

        assert_eq!(
            schedule.transition(RetryState::Succeeded, RetryEvent::Failed),
            RetryState::Succeeded
        );
        let start = schedule.start();
        assert_eq!(schedule.transition(start, RetryEvent::BackoffElapsed), start);
    }

    #[test]
    fn test_backoff_delay_scales_with_base() {
        let config = RequestConfig::default().with_backoff_base(Duration::from_millis(10));
        let schedule = RetrySchedule::new(classify(SLOW_URL), &config);

        assert_eq!(schedule.backoff_delay(1), Duration::from_millis(20));
        assert_eq!(schedule.backoff_delay(3), Duration::from_millis(80));
    }

    #[test]
    fn test_unbounded_budget_near_limit() {
        let config = RequestConfig::default().with_slow_max_retries(u32::MAX);
        let schedule = RetrySchedule::new(classify(SLOW_URL), &config);
        let timeout = Duration::from_secs(120);

        let next = schedule.transition(
            RetryState::Attempting {
                attempt: u32::MAX - 1,
                timeout,
            },
            RetryEvent::Failed,
        );
        assert!(matches!(next, RetryState::WaitingBackoff { retry: u32::MAX, .. }));

        let last = schedule.transition(
            RetryState::Attempting {
                attempt: u32::MAX,
                timeout,
            },
            RetryEvent::Failed,
        );
        assert_eq!(last, RetryState::ExhaustedRetries);
    }
}
