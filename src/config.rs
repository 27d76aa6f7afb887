//! Restvol global configuration options.

use std::{
    sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

/// Global configuration options for the restvol crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
/// Per-client overrides are possible through [`SchedulerOptions`](crate::scheduler::SchedulerOptions), which snapshot these values when created.
///
/// # Transport Configuration Options
///
/// ## Max Connections Per Host
/// > default: `8`
///
/// The maximum number of simultaneous connections opened to a single host by a multiplexer.
/// This caps concurrency independently of how many transfer requests are issued in one bulk call.
///
/// ## Poll Interval
/// > default: `100ms`
///
/// The interval the transfer scheduler waits on the multiplexer per iteration of its drain loop.
///
/// ## Request Timeout
/// > default: `300s`
///
/// The timeout applied to each individual HTTP request.
///
/// # Retry Configuration Options
///
/// ## Max Retry Attempts
/// > default: `5`
///
/// The number of times a request failing with a retryable error is re-enqueued after its first attempt.
///
/// ## Initial Backoff
/// > default: `100ms`
///
/// The delay before the first retry. Each subsequent retry doubles the delay, up to the [max backoff](#max-backoff).
///
/// ## Max Backoff
/// > default: `5s`
///
/// The largest delay between two attempts of the same request.
///
/// ## Max Backoff Window
/// > default: `30s`
///
/// The total backoff time a single request may accumulate before it is failed with its last observed error.
///
/// # Encoding Configuration Options
///
/// ## Base64 JSON Writes
/// > default: [`true`]
///
/// If enabled, JSON write bodies carry element data as a `value_base64` string.
/// Otherwise element values are written as a JSON `value` array.
#[derive(Debug, Clone)]
pub struct Config {
    max_connections_per_host: usize,
    poll_interval: Duration,
    request_timeout: Duration,
    max_retry_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    max_backoff_window: Duration,
    base64_json_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_connections_per_host: 8,
            poll_interval: Duration::from_millis(100),
            request_timeout: Duration::from_secs(300),
            max_retry_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            max_backoff_window: Duration::from_secs(30),
            base64_json_writes: true,
        }
    }
}

impl Config {
    /// Get the [max connections per host](#max-connections-per-host) configuration.
    #[must_use]
    pub fn max_connections_per_host(&self) -> usize {
        self.max_connections_per_host
    }

    /// Set the [max connections per host](#max-connections-per-host) configuration.
    ///
    /// A value of zero is treated as one.
    pub fn set_max_connections_per_host(&mut self, max_connections_per_host: usize) {
        self.max_connections_per_host = max_connections_per_host.max(1);
    }

    /// Get the [poll interval](#poll-interval) configuration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Set the [poll interval](#poll-interval) configuration.
    pub fn set_poll_interval(&mut self, poll_interval: Duration) {
        self.poll_interval = poll_interval;
    }

    /// Get the [request timeout](#request-timeout) configuration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Set the [request timeout](#request-timeout) configuration.
    pub fn set_request_timeout(&mut self, request_timeout: Duration) {
        self.request_timeout = request_timeout;
    }

    /// Get the [max retry attempts](#max-retry-attempts) configuration.
    #[must_use]
    pub fn max_retry_attempts(&self) -> u32 {
        self.max_retry_attempts
    }

    /// Set the [max retry attempts](#max-retry-attempts) configuration.
    pub fn set_max_retry_attempts(&mut self, max_retry_attempts: u32) {
        self.max_retry_attempts = max_retry_attempts;
    }

    /// Get the [initial backoff](#initial-backoff) configuration.
    #[must_use]
    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Set the [initial backoff](#initial-backoff) configuration.
    pub fn set_initial_backoff(&mut self, initial_backoff: Duration) {
        self.initial_backoff = initial_backoff;
    }

    /// Get the [max backoff](#max-backoff) configuration.
    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Set the [max backoff](#max-backoff) configuration.
    pub fn set_max_backoff(&mut self, max_backoff: Duration) {
        self.max_backoff = max_backoff;
    }

    /// Get the [max backoff window](#max-backoff-window) configuration.
    #[must_use]
    pub fn max_backoff_window(&self) -> Duration {
        self.max_backoff_window
    }

    /// Set the [max backoff window](#max-backoff-window) configuration.
    pub fn set_max_backoff_window(&mut self, max_backoff_window: Duration) {
        self.max_backoff_window = max_backoff_window;
    }

    /// Get the [base64 JSON writes](#base64-json-writes) configuration.
    #[must_use]
    pub fn base64_json_writes(&self) -> bool {
        self.base64_json_writes
    }

    /// Set the [base64 JSON writes](#base64-json-writes) configuration.
    pub fn set_base64_json_writes(&mut self, base64_json_writes: bool) {
        self.base64_json_writes = base64_json_writes;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global restvol configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global restvol configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}
