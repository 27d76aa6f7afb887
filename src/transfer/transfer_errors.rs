use thiserror::Error;

use crate::{
    conversion::ConversionError,
    selection::SelectionError,
    transport::{classify_status, status_message, StatusClass, TransportError},
    wire::WireCodecError,
};

/// A transfer error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum TransferError {
    /// A selection error.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// A type conversion error.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    /// A wire codec error.
    #[error(transparent)]
    WireCodec(#[from] WireCodecError),
    /// A transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The array store responded with a non-success status.
    #[error("{message} ({url})")]
    Status {
        /// The status code.
        status: u16,
        /// The status message.
        message: &'static str,
        /// The request URL.
        url: String,
    },
    /// A caller buffer of the wrong length.
    #[error("caller buffer has length {got}, expected length {expected}")]
    InvalidBufferLength {
        /// The buffer length.
        got: usize,
        /// The expected buffer length.
        expected: usize,
    },
    /// A caller element type of variable size.
    #[error("caller data type {0} has a variable size")]
    VariableSizeCallerType(String),
    /// A transfer that did not reach a terminal state within the poll iteration limit.
    #[error("transfer did not complete within {0} poll iterations")]
    Incomplete(u64),
}

impl TransferError {
    /// Create a status error for a response to `url`.
    #[must_use]
    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: status_message(status),
            url: url.into(),
        }
    }

    /// Returns true if the transfer may succeed if retried.
    ///
    /// Connection failures, timeouts and server errors (`5xx`) are retryable.
    /// Client errors (`4xx`) and selection, codec and conversion errors are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_retryable(),
            Self::Status { status, .. } => classify_status(*status) == StatusClass::Retryable,
            _ => false,
        }
    }
}

/// A bulk transfer error: the first fatal error and the number of failed transfers.
#[derive(Clone, Debug, Error)]
#[error("{failed} of {total} transfers failed, first failure for {target}: {first}")]
pub struct BulkTransferError {
    target: String,
    first: TransferError,
    failed: usize,
    total: usize,
}

impl BulkTransferError {
    /// Create a new bulk transfer error.
    #[must_use]
    pub fn new(target: String, first: TransferError, failed: usize, total: usize) -> Self {
        Self {
            target,
            first,
            failed,
            total,
        }
    }

    /// Return the target of the first failed transfer.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Return the error of the first failed transfer.
    #[must_use]
    pub fn first(&self) -> &TransferError {
        &self.first
    }

    /// Return the number of failed transfers.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Return the total number of transfers.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_error_retryable() {
        assert!(TransferError::status(503, "http://localhost").is_retryable());
        assert!(TransferError::status(501, "http://localhost").is_retryable());
        assert!(!TransferError::status(404, "http://localhost").is_retryable());
        assert!(!TransferError::status(413, "http://localhost").is_retryable());
        assert!(TransferError::from(TransportError::Timeout(String::new())).is_retryable());
        assert!(!TransferError::from(SelectionError::PointsAsQueryParam).is_retryable());
        assert_eq!(
            TransferError::status(404, "http://localhost/datasets/d-1/value").to_string(),
            "404 - Resource not found (http://localhost/datasets/d-1/value)"
        );
    }

    #[test]
    fn bulk_transfer_error() {
        let err = BulkTransferError::new(
            "d-2".to_string(),
            TransferError::status(400, "http://localhost/datasets/d-2/value"),
            2,
            5,
        );
        assert_eq!(err.failed(), 2);
        assert_eq!(err.total(), 5);
        assert_eq!(err.target(), "d-2");
        assert!(err.to_string().starts_with("2 of 5 transfers failed"));
    }
}
