use std::borrow::Cow;

use thiserror::Error;

use crate::selection::Dataspace;

/// An incompatible buffer length error.
#[derive(Copy, Clone, Debug, Error)]
#[error("buffer has length {0}, expected length {1}")]
pub struct IncompatibleBufferLengthError(usize, usize);

impl IncompatibleBufferLengthError {
    /// Create a new incompatible buffer length error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

fn check_buffers(
    packed: usize,
    memory: usize,
    space: &Dataspace,
    element_size: usize,
) -> Result<(), IncompatibleBufferLengthError> {
    let expected_memory = space.extent_num_elements() as usize * element_size;
    if memory != expected_memory {
        return Err(IncompatibleBufferLengthError::new(memory, expected_memory));
    }
    let expected_packed = space.num_elements() as usize * element_size;
    if packed != expected_packed {
        return Err(IncompatibleBufferLengthError::new(packed, expected_packed));
    }
    Ok(())
}

/// Scatter packed elements into the selection of `space` in `memory`.
///
/// `packed` holds the selected elements in selection traversal order, and `memory` holds every element of the extent of `space`.
/// Chunks of `packed` are handed out sequentially to each contiguous run of the selection until it is exhausted.
///
/// # Errors
/// Returns an [`IncompatibleBufferLengthError`] if either buffer length does not match `space`.
pub fn scatter(
    packed: &[u8],
    memory: &mut [u8],
    space: &Dataspace,
    element_size: usize,
) -> Result<(), IncompatibleBufferLengthError> {
    check_buffers(packed.len(), memory.len(), space, element_size)?;
    let mut producer = packed;
    for (start, length) in space.contiguous_runs() {
        let start = start as usize * element_size;
        let length = length as usize * element_size;
        let (chunk, rest) = producer.split_at(length);
        memory[start..start + length].copy_from_slice(chunk);
        producer = rest;
    }
    debug_assert!(producer.is_empty());
    Ok(())
}

/// Gather the selection of `space` in `memory` into packed elements in selection traversal order.
///
/// A contiguous selection is borrowed from `memory` without copying.
///
/// # Errors
/// Returns an [`IncompatibleBufferLengthError`] if `memory` does not hold every element of the extent of `space`.
pub fn gather<'a>(
    memory: &'a [u8],
    space: &Dataspace,
    element_size: usize,
) -> Result<Cow<'a, [u8]>, IncompatibleBufferLengthError> {
    let num_bytes = space.num_elements() as usize * element_size;
    check_buffers(num_bytes, memory.len(), space, element_size)?;
    if let Some((start, _)) = space.contiguous_region() {
        let start = start as usize * element_size;
        return Ok(Cow::Borrowed(&memory[start..start + num_bytes]));
    }
    let mut packed = Vec::with_capacity(num_bytes);
    for (start, length) in space.contiguous_runs() {
        let start = start as usize * element_size;
        packed.extend_from_slice(&memory[start..start + length as usize * element_size]);
    }
    Ok(Cow::Owned(packed))
}
