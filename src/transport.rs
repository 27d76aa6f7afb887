//! Transport handles and the shared multiplexer.
//!
//! Each transfer owns one [`HttpRequest`].
//! Requests are added to a [`Multiplexer`], which executes them over a bounded number of concurrent connections and reports completions when polled.
//!
//! The `http` feature provides [`ReqwestMultiplexer`], backed by a blocking [`reqwest`](https://docs.rs/reqwest) client.

mod connection;
mod http_request;
#[cfg(feature = "http")]
mod reqwest_multiplexer;
mod status;

pub use connection::{ConnectionContext, URL_MAX_LENGTH};
pub use http_request::{HttpMethod, HttpRequest, HttpResponse, TransferHandle};
#[cfg(feature = "http")]
pub use reqwest_multiplexer::ReqwestMultiplexer;
pub use status::{classify_status, status_message, StatusClass};

use std::time::Duration;

use thiserror::Error;

/// A transport error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The connection failed or was reset.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// An invalid URL.
    #[error("invalid URL {0}")]
    InvalidUrl(String),
    /// A request URL exceeding the maximum length.
    #[error("request URL of length {0} exceeds the maximum length {1}")]
    UrlTooLong(usize, usize),
    /// A request that could not be built, such as one with an invalid header.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// A completion for a handle that was never added.
    #[error("unknown transfer handle {0}")]
    UnknownHandle(TransferHandle),
}

impl TransportError {
    /// Returns true if the request may succeed if retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// A completed transfer: its handle and the response or transport error.
pub type Completion = (TransferHandle, Result<HttpResponse, TransportError>);

/// Executes requests concurrently and reports their completion.
///
/// A multiplexer is only ever driven from a single thread.
/// Every added request is reported exactly once by [`poll`](Multiplexer::poll).
pub trait Multiplexer {
    /// Add a request, returning the handle its completion will be reported with.
    ///
    /// # Errors
    /// Returns a [`TransportError`] if the request cannot be added.
    fn add(&mut self, request: HttpRequest) -> Result<TransferHandle, TransportError>;

    /// Wait up to `timeout` for transfers to complete, and return the completed transfers.
    ///
    /// Returns an empty vector if no transfer completed within `timeout`.
    fn poll(&mut self, timeout: Duration) -> Vec<Completion>;

    /// Return the number of added transfers that have not yet been reported as completed.
    fn pending(&self) -> usize;
}

impl<M: Multiplexer + ?Sized> Multiplexer for &mut M {
    fn add(&mut self, request: HttpRequest) -> Result<TransferHandle, TransportError> {
        (**self).add(request)
    }

    fn poll(&mut self, timeout: Duration) -> Vec<Completion> {
        (**self).poll(timeout)
    }

    fn pending(&self) -> usize {
        (**self).pending()
    }
}
