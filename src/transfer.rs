//! Transfer requests.
//!
//! A [`TransferRequest`] is created per target array for each bulk read or write.
//! It moves through the [`TransferState`] machine as the [`TransferScheduler`](crate::scheduler::TransferScheduler) drives it, and tracks its retries in a [`RetryState`].

mod transfer_errors;
mod transfer_request;
mod transfer_state;

pub use transfer_errors::{BulkTransferError, TransferError};
pub use transfer_request::{CallerBuffer, TransferRequest};
pub use transfer_state::{RetryPolicy, RetryState, TransferDirection, TransferState};
