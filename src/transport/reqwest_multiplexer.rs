use std::{collections::VecDeque, time::Duration};

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;
use reqwest::{blocking::Client, Method};

use crate::config::global_config;

use super::{
    Completion, HttpMethod, HttpRequest, HttpResponse, Multiplexer, TransferHandle, TransportError,
};

/// A [`Multiplexer`] backed by a blocking [`reqwest`] client.
///
/// Each poll executes every queued request on the [`rayon`] global thread pool, at most `max_connections` at a time.
/// [`add`](Multiplexer::add) only queues a request, so no network I/O happens on the thread that submits transfers until it polls.
/// The per-request timeout is set on the client, so a poll may block for longer than its `timeout`.
#[derive(Debug)]
pub struct ReqwestMultiplexer {
    client: Client,
    max_connections: usize,
    queue: VecDeque<(TransferHandle, HttpRequest)>,
    next_handle: u64,
}

#[allow(clippy::needless_pass_by_value)]
fn handle_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}

impl ReqwestMultiplexer {
    /// Create a new multiplexer with the connection limit and request timeout of the global configuration.
    ///
    /// # Errors
    /// Returns a [`TransportError`] if the HTTP client cannot be created.
    pub fn new() -> Result<Self, TransportError> {
        let (max_connections, request_timeout) = {
            let config = global_config();
            (config.max_connections_per_host(), config.request_timeout())
        };
        Self::new_with_limits(max_connections, request_timeout)
    }

    /// Create a new multiplexer executing at most `max_connections` requests at a time, each with `request_timeout`.
    ///
    /// # Errors
    /// Returns a [`TransportError`] if the HTTP client cannot be created.
    pub fn new_with_limits(
        max_connections: usize,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let max_connections = max_connections.max(1);
        let client = Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(max_connections)
            .build()
            .map_err(handle_reqwest_error)?;
        Ok(Self {
            client,
            max_connections,
            queue: VecDeque::new(),
            next_handle: 0,
        })
    }

    /// Return the maximum number of concurrent requests.
    #[must_use]
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    fn execute(client: &Client, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method() {
            HttpMethod::Get => Method::GET,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Post => Method::POST,
        };
        let mut builder = client.request(method, request.url());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body().is_empty() {
            builder = builder.body(request.body().to_vec());
        }
        let response = builder.send().map_err(handle_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(handle_reqwest_error)?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

impl Multiplexer for ReqwestMultiplexer {
    fn add(&mut self, request: HttpRequest) -> Result<TransferHandle, TransportError> {
        let handle = TransferHandle::new(self.next_handle);
        self.next_handle += 1;
        log::trace!("{handle}: {} {}", request.method(), request.url());
        self.queue.push_back((handle, request));
        Ok(handle)
    }

    fn poll(&mut self, _timeout: Duration) -> Vec<Completion> {
        let batch: Vec<_> = self.queue.drain(..).collect();
        let client = &self.client;
        iter_concurrent_limit!(self.max_connections, batch, map, |(handle, request)| {
            (handle, Self::execute(client, request))
        })
        .collect()
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reqwest_multiplexer_limits() {
        let multiplexer = ReqwestMultiplexer::new_with_limits(0, Duration::from_secs(1)).unwrap();
        assert_eq!(multiplexer.max_connections(), 1);
    }

    #[test]
    fn reqwest_multiplexer_refused() {
        let mut multiplexer =
            ReqwestMultiplexer::new_with_limits(2, Duration::from_secs(2)).unwrap();
        assert!(multiplexer.poll(Duration::ZERO).is_empty());
        let first = multiplexer
            .add(HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:9/datasets/a/value"))
            .unwrap();
        let second = multiplexer
            .add(HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:9/datasets/b/value"))
            .unwrap();
        assert_eq!(multiplexer.pending(), 2);

        let completions = multiplexer.poll(Duration::ZERO);
        assert_eq!(multiplexer.pending(), 0);
        let handles: Vec<_> = completions.iter().map(|(handle, _)| *handle).collect();
        assert_eq!(handles, vec![first, second]);
        for (_, result) in completions {
            assert!(result.unwrap_err().is_retryable());
        }
    }
}
