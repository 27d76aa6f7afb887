//! The concurrent transfer scheduler.
//!
//! The [`TransferScheduler`] drives every [`TransferRequest`] of a bulk call to a terminal state from a single polling loop on the calling thread.
//! The only shared object is the [`Multiplexer`], which bounds the number of concurrent connections independently of the number of requests.

use std::time::{Duration, Instant};

use crate::{
    config::global_config,
    transfer::{BulkTransferError, RetryPolicy, TransferError, TransferRequest, TransferState},
    transport::{ConnectionContext, Multiplexer},
};

/// Transfer scheduler options.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    poll_interval: Duration,
    retry_policy: RetryPolicy,
    base64_json_writes: bool,
    max_poll_iterations: Option<u64>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptionsBuilder::new().build()
    }
}

impl SchedulerOptions {
    /// Create a new scheduler options builder.
    #[must_use]
    pub fn builder() -> SchedulerOptionsBuilder {
        SchedulerOptionsBuilder::new()
    }

    /// Return the poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Return the retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns true if JSON write bodies carry base64 encoded values.
    #[must_use]
    pub fn base64_json_writes(&self) -> bool {
        self.base64_json_writes
    }

    /// Return the maximum number of poll iterations of a bulk call, if limited.
    #[must_use]
    pub fn max_poll_iterations(&self) -> Option<u64> {
        self.max_poll_iterations
    }
}

/// Builder for [`SchedulerOptions`].
#[derive(Debug, Clone)]
pub struct SchedulerOptionsBuilder {
    poll_interval: Duration,
    max_retry_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    max_backoff_window: Duration,
    base64_json_writes: bool,
    max_poll_iterations: Option<u64>,
}

impl Default for SchedulerOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerOptionsBuilder {
    /// Create a new scheduler options builder initialised from the global configuration.
    #[must_use]
    pub fn new() -> Self {
        let config = global_config();
        Self {
            poll_interval: config.poll_interval(),
            max_retry_attempts: config.max_retry_attempts(),
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
            max_backoff_window: config.max_backoff_window(),
            base64_json_writes: config.base64_json_writes(),
            max_poll_iterations: None,
        }
    }

    /// Build into scheduler options.
    #[must_use]
    pub fn build(&self) -> SchedulerOptions {
        SchedulerOptions {
            poll_interval: self.poll_interval,
            retry_policy: RetryPolicy::new(
                self.max_retry_attempts,
                self.initial_backoff,
                self.max_backoff,
                self.max_backoff_window,
            ),
            base64_json_writes: self.base64_json_writes,
            max_poll_iterations: self.max_poll_iterations,
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the maximum number of retries of a transfer.
    #[must_use]
    pub fn max_retry_attempts(mut self, max_retry_attempts: u32) -> Self {
        self.max_retry_attempts = max_retry_attempts;
        self
    }

    /// Set the backoff before the first retry.
    #[must_use]
    pub fn initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Set the maximum backoff before a retry.
    #[must_use]
    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Set the maximum total backoff of a transfer.
    #[must_use]
    pub fn max_backoff_window(mut self, max_backoff_window: Duration) -> Self {
        self.max_backoff_window = max_backoff_window;
        self
    }

    /// Set whether JSON write bodies carry base64 encoded values.
    #[must_use]
    pub fn base64_json_writes(mut self, base64_json_writes: bool) -> Self {
        self.base64_json_writes = base64_json_writes;
        self
    }

    /// Limit the number of poll iterations of a bulk call.
    ///
    /// Transfers that are not terminal after `max_poll_iterations` fail with [`TransferError::Incomplete`].
    #[must_use]
    pub fn max_poll_iterations(mut self, max_poll_iterations: Option<u64>) -> Self {
        self.max_poll_iterations = max_poll_iterations;
        self
    }
}

/// The summary of a successful bulk call.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TransferSummary {
    /// The number of transfers.
    pub transfers: usize,
    /// The number of requests sent, including retries.
    pub attempts: u64,
    /// The number of poll iterations.
    pub poll_iterations: u64,
}

/// Drives transfer requests to completion over a shared [`Multiplexer`].
#[derive(Debug)]
pub struct TransferScheduler<M: Multiplexer> {
    multiplexer: M,
    connection: ConnectionContext,
    options: SchedulerOptions,
}

impl<M: Multiplexer> TransferScheduler<M> {
    /// Create a new scheduler with default options.
    #[must_use]
    pub fn new(multiplexer: M, connection: ConnectionContext) -> Self {
        Self::new_with_options(multiplexer, connection, SchedulerOptions::default())
    }

    /// Create a new scheduler with `options`.
    #[must_use]
    pub fn new_with_options(
        multiplexer: M,
        connection: ConnectionContext,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            multiplexer,
            connection,
            options,
        }
    }

    /// Return the connection context.
    #[must_use]
    pub fn connection(&self) -> &ConnectionContext {
        &self.connection
    }

    /// Return the options.
    #[must_use]
    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Set the options.
    pub fn set_options(&mut self, options: SchedulerOptions) {
        self.options = options;
    }

    /// Return the multiplexer.
    #[must_use]
    pub fn multiplexer(&self) -> &M {
        &self.multiplexer
    }

    /// Return a mutable reference to the multiplexer.
    #[must_use]
    pub fn multiplexer_mut(&mut self) -> &mut M {
        &mut self.multiplexer
    }

    /// Drive every transfer to a terminal state.
    ///
    /// A failed transfer does not abort its siblings: every transfer is drained before returning.
    /// Succeeded transfers are durable, there is no rollback if a sibling fails.
    ///
    /// # Errors
    /// Returns a [`BulkTransferError`] with the first failed transfer (in request order) and the number of failed transfers if any transfer failed.
    pub fn execute(
        &mut self,
        transfers: &mut [TransferRequest<'_>],
    ) -> Result<TransferSummary, BulkTransferError> {
        let policy = *self.options.retry_policy();
        for transfer in transfers.iter_mut() {
            if transfer.state() == TransferState::Init {
                if let Err(err) =
                    transfer.configure(&self.connection, self.options.base64_json_writes())
                {
                    transfer.fail(err);
                }
            }
            if transfer.state() == TransferState::Configured {
                if let Err(err) = transfer.enqueue(&mut self.multiplexer) {
                    transfer.fail(err);
                }
            }
        }

        let mut poll_iterations = 0;
        loop {
            let now = Instant::now();
            for transfer in transfers.iter_mut().filter(|transfer| transfer.retry_due(now)) {
                if let Err(err) = transfer.enqueue(&mut self.multiplexer) {
                    transfer.fail(err);
                }
            }
            if transfers.iter().all(|transfer| transfer.state().is_terminal()) {
                break;
            }
            if let Some(max_poll_iterations) = self.options.max_poll_iterations() {
                if poll_iterations >= max_poll_iterations {
                    fail_unfinished(transfers, poll_iterations);
                    break;
                }
            }

            transfers
                .iter_mut()
                .for_each(TransferRequest::begin_flight);
            let in_flight = transfers
                .iter()
                .filter(|transfer| transfer.state() == TransferState::InFlight)
                .count();
            poll_iterations += 1;
            if in_flight == 0 {
                // only backoffs remain
                if let Some(due) = transfers
                    .iter()
                    .filter_map(|transfer| transfer.retry().next_retry_at())
                    .min()
                {
                    std::thread::sleep(due.saturating_duration_since(Instant::now()));
                }
                continue;
            }

            let completions = self.multiplexer.poll(self.options.poll_interval());
            let completed = completions.len();
            for (handle, result) in completions {
                match transfers
                    .iter_mut()
                    .find(|transfer| transfer.handle() == Some(handle))
                {
                    Some(transfer) => transfer.complete(result, &policy, Instant::now()),
                    None => log::warn!("ignoring completion of unknown transfer {handle}"),
                }
            }
            if completed == 0 && self.multiplexer.pending() == 0 {
                // the multiplexer will never report the remaining transfers
                fail_unfinished(transfers, poll_iterations);
            }
        }

        let failed = transfers
            .iter()
            .filter(|transfer| transfer.state() == TransferState::Failed)
            .count();
        let attempts = transfers
            .iter()
            .map(|transfer| u64::from(transfer.retry().attempt_count()))
            .sum();
        log::debug!(
            "bulk transfer of {} requests finished after {poll_iterations} poll iterations and {attempts} attempts, {failed} failed",
            transfers.len()
        );
        match transfers.iter().find(|transfer| transfer.state() == TransferState::Failed) {
            Some(transfer) => Err(BulkTransferError::new(
                transfer.array().id().to_string(),
                transfer
                    .error()
                    .cloned()
                    .unwrap_or(TransferError::Incomplete(poll_iterations)),
                failed,
                transfers.len(),
            )),
            None => Ok(TransferSummary {
                transfers: transfers.len(),
                attempts,
                poll_iterations,
            }),
        }
    }
}

fn fail_unfinished(transfers: &mut [TransferRequest<'_>], poll_iterations: u64) {
    for transfer in transfers
        .iter_mut()
        .filter(|transfer| !transfer.state().is_terminal())
    {
        transfer.fail(TransferError::Incomplete(poll_iterations));
    }
}
