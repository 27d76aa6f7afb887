//! The wire value decoder and encoder.
//!
//! Element values travel to and from the array store either as raw packed bytes ("binary") or as JSON value trees.
//! This module decodes both into packed native elements of the wire data type, and encodes packed native elements into write request bodies.
//! It also implements [`scatter`] and [`gather`] between packed buffers and possibly non-contiguous selections of caller memory.

mod json_values;
mod object_reference;
mod payload;
mod scatter_gather;
mod wire_value;

pub use json_values::{decode_json_values, encode_json_values};
pub use object_reference::{ObjectReference, ObjectReferenceKind};
pub use payload::{decode_binary_payload, decode_json_payload, encode_write_body, RequestBody};
pub use scatter_gather::{gather, scatter, IncompatibleBufferLengthError};
pub use wire_value::WireValue;

use thiserror::Error;

use crate::selection::SelectionError;

/// A wire codec error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum WireCodecError {
    /// A response body that is not valid JSON, or lacks a `value` field.
    #[error("malformed JSON response: {0}")]
    MalformedJson(String),
    /// A JSON element of a kind that cannot be decoded into its data type.
    #[error("unsupported JSON value {value} for data type {data_type}")]
    UnsupportedElementKind {
        /// The offending JSON value.
        value: String,
        /// The data type.
        data_type: String,
    },
    /// A data type that cannot be carried by the transfer mode.
    #[error("data type {0} cannot be transferred")]
    UnsupportedDataType(String),
    /// A response with a different number of elements than selected.
    #[error("response holds {got} elements, expected {expected}")]
    ElementCountMismatch {
        /// The number of elements in the response.
        got: u64,
        /// The number of selected elements.
        expected: u64,
    },
    /// An invalid object reference.
    #[error("invalid object reference {0:?}")]
    InvalidObjectReference(String),
    /// A buffer of the wrong length.
    #[error(transparent)]
    BufferLength(#[from] IncompatibleBufferLengthError),
    /// A selection error.
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

impl From<serde_json::Error> for WireCodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedJson(err.to_string())
    }
}
