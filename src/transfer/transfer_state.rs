use std::time::{Duration, Instant};

use derive_more::Display;

use super::TransferError;

/// The state of a transfer.
///
/// `Init → Configured → Enqueued → InFlight → {Succeeded, RetryPending, Failed}`, and `RetryPending → Enqueued` once its backoff has elapsed.
/// [`Succeeded`](TransferState::Succeeded) and [`Failed`](TransferState::Failed) are terminal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum TransferState {
    /// Created.
    #[display("init")]
    Init,
    /// The request is built.
    #[display("configured")]
    Configured,
    /// The request is added to the multiplexer.
    #[display("enqueued")]
    Enqueued,
    /// The request is executing.
    #[display("in flight")]
    InFlight,
    /// Waiting for a backoff to elapse before retrying.
    #[display("retry pending")]
    RetryPending,
    /// Completed successfully.
    #[display("succeeded")]
    Succeeded,
    /// Failed.
    #[display("failed")]
    Failed,
}

impl TransferState {
    /// Returns true if the state is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true if a transition from this state to `next` is valid.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Configured | Self::Failed)
                | (Self::Configured, Self::Enqueued | Self::Succeeded | Self::Failed)
                | (Self::Enqueued, Self::InFlight | Self::Failed)
                | (Self::InFlight, Self::Succeeded | Self::RetryPending | Self::Failed)
                | (Self::RetryPending, Self::Enqueued | Self::Failed)
        )
    }
}

/// The direction of a transfer.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum TransferDirection {
    /// Read from the array store into caller memory.
    #[display("read")]
    Read,
    /// Write from caller memory to the array store.
    #[display("write")]
    Write,
}

/// The retry limits of a transfer.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    max_backoff_window: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy.
    ///
    /// A transfer is retried at most `max_attempts` times after its first attempt.
    /// The backoff before retry `n` (from 1) is `initial_backoff * 2^(n-1)`, capped at `max_backoff`, and the total backoff of a transfer may not exceed `max_backoff_window`.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        max_backoff_window: Duration,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            max_backoff_window,
        }
    }

    /// Return the maximum number of retries.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Return the backoff before retry `retry` (from 1).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// The retry state of a transfer.
#[derive(Clone, Debug, Default)]
pub struct RetryState {
    attempt_count: u32,
    next_retry_at: Option<Instant>,
    total_backoff: Duration,
    last_error: Option<TransferError>,
}

impl RetryState {
    /// Return the number of attempts started.
    #[must_use]
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Return the time the next retry is due, if one is pending.
    #[must_use]
    pub fn next_retry_at(&self) -> Option<Instant> {
        self.next_retry_at
    }

    /// Return the last error observed.
    #[must_use]
    pub fn last_error(&self) -> Option<&TransferError> {
        self.last_error.as_ref()
    }

    /// Return the total backoff scheduled.
    #[must_use]
    pub fn total_backoff(&self) -> Duration {
        self.total_backoff
    }

    /// Record the start of an attempt.
    pub(crate) fn start_attempt(&mut self) {
        self.attempt_count += 1;
        self.next_retry_at = None;
    }

    /// Record a failed attempt and schedule a retry if `error` is retryable and `policy` allows it.
    ///
    /// Returns true if a retry is scheduled.
    pub(crate) fn schedule_retry(
        &mut self,
        policy: &RetryPolicy,
        error: TransferError,
        now: Instant,
    ) -> bool {
        let retryable = error.is_retryable();
        self.last_error = Some(error);
        let retry = self.attempt_count;
        if !retryable || retry > policy.max_attempts() {
            return false;
        }
        let backoff = policy.backoff(retry);
        if self.total_backoff + backoff > policy.max_backoff_window {
            return false;
        }
        self.total_backoff += backoff;
        self.next_retry_at = Some(now + backoff);
        true
    }

    /// Returns true if a pending retry is due at `now`.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_retry_at.map_or(true, |at| at <= now)
    }

    /// Take the last error observed.
    pub(crate) fn take_last_error(&mut self) -> Option<TransferError> {
        self.last_error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(
            3,
            Duration::from_millis(100),
            Duration::from_millis(250),
            Duration::from_secs(10),
        )
    }

    #[test]
    fn backoff_exponential_capped() {
        let policy = policy();
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(250));
        assert_eq!(policy.backoff(40), Duration::from_millis(250));
    }

    #[test]
    fn retry_exhaustion() {
        let policy = policy();
        let now = Instant::now();
        let mut retry = RetryState::default();
        let error = || TransferError::from(TransportError::Connection("reset".to_string()));
        for attempt in 1..=3 {
            retry.start_attempt();
            assert_eq!(retry.attempt_count(), attempt);
            assert!(retry.schedule_retry(&policy, error(), now));
            assert!(!retry.is_due(now));
        }
        retry.start_attempt();
        assert!(!retry.schedule_retry(&policy, error(), now));
        assert_eq!(retry.total_backoff(), Duration::from_millis(550));
        assert!(retry.last_error().is_some());
    }

    #[test]
    fn retry_fatal_and_window() {
        let now = Instant::now();
        let mut retry = RetryState::default();
        retry.start_attempt();
        assert!(!retry.schedule_retry(&policy(), TransferError::status(404, ""), now));

        let narrow = RetryPolicy::new(
            10,
            Duration::from_millis(100),
            Duration::from_secs(1),
            Duration::from_millis(250),
        );
        let mut retry = RetryState::default();
        retry.start_attempt();
        assert!(retry.schedule_retry(&narrow, TransferError::status(503, ""), now));
        retry.start_attempt();
        assert!(!retry.schedule_retry(&narrow, TransferError::status(503, ""), now));
    }

    #[test]
    fn state_transitions() {
        use TransferState::*;
        assert!(Init.can_transition_to(Configured));
        assert!(InFlight.can_transition_to(RetryPending));
        assert!(RetryPending.can_transition_to(Enqueued));
        assert!(!Succeeded.can_transition_to(Enqueued));
        assert!(!Init.can_transition_to(InFlight));
        assert!(Failed.is_terminal() && Succeeded.is_terminal() && !RetryPending.is_terminal());
    }
}
