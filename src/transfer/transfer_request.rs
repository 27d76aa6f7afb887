use std::{borrow::Cow, time::Instant};

use serde_json::Value;

use crate::{
    client::RemoteArray,
    conversion::{convert_into_selection, convert_to_new, needs_conversion, ConversionPlan},
    data_type::DataType,
    negotiation::{choose_transfer_mode_for, TransferMode},
    selection::{
        check_element_counts, encode_json_body, encode_query_param, Dataspace, Selection,
        SelectionKind,
    },
    transport::{
        classify_status, ConnectionContext, HttpMethod, HttpRequest, HttpResponse, Multiplexer,
        StatusClass, TransferHandle, TransportError,
    },
    wire::{
        decode_binary_payload, decode_json_payload, encode_write_body, gather, scatter,
        WireCodecError,
    },
};

use super::{RetryPolicy, RetryState, TransferDirection, TransferError, TransferState};

/// The caller memory of a transfer.
#[derive(Debug)]
pub enum CallerBuffer<'a> {
    /// The destination of a read.
    Read(&'a mut [u8]),
    /// The source of a write.
    Write(&'a [u8]),
}

impl CallerBuffer<'_> {
    fn len(&self) -> usize {
        match self {
            Self::Read(buffer) => buffer.len(),
            Self::Write(buffer) => buffer.len(),
        }
    }
}

/// The unit of work of one array in a bulk read or write.
///
/// A transfer request owns its request, response and scratch buffers, and is only ever mutated by the thread driving the [`TransferScheduler`](crate::scheduler::TransferScheduler).
#[derive(Debug)]
pub struct TransferRequest<'a> {
    array: &'a RemoteArray,
    file_space: Dataspace,
    memory_space: Dataspace,
    caller_type: DataType,
    buffer: CallerBuffer<'a>,
    state: TransferState,
    mode: Option<TransferMode>,
    request: Option<HttpRequest>,
    handle: Option<TransferHandle>,
    retry: RetryState,
    error: Option<TransferError>,
}

/// Resolve the file and memory dataspaces of a transfer.
///
/// An omitted memory dataspace is the array extent with a copy of the file selection.
fn resolve_dataspaces(
    array_shape: &[u64],
    file_selection: Selection,
    memory_space: Option<Dataspace>,
) -> Result<(Dataspace, Dataspace), TransferError> {
    let memory_space = match memory_space {
        Some(memory_space) => memory_space,
        None => Dataspace::new_with_selection(array_shape.to_vec(), file_selection.clone())?,
    };
    let file_space = Dataspace::new_with_selection(array_shape.to_vec(), file_selection)?;
    check_element_counts(&file_space, &memory_space)?;
    Ok((file_space, memory_space))
}

impl<'a> TransferRequest<'a> {
    /// Create a new read of the `file_selection` of `array` into the `memory_space` selection of `buffer`, which holds elements of `caller_type`.
    ///
    /// If `memory_space` is [`None`], `buffer` holds the array extent and the file selection is used in memory too.
    ///
    /// # Errors
    /// Returns a [`TransferError`] if the selections are invalid, select differing numbers of elements, or `buffer` does not match the memory extent.
    pub fn new_read(
        array: &'a RemoteArray,
        file_selection: Selection,
        memory_space: Option<Dataspace>,
        caller_type: DataType,
        buffer: &'a mut [u8],
    ) -> Result<Self, TransferError> {
        Self::new(
            array,
            file_selection,
            memory_space,
            caller_type,
            CallerBuffer::Read(buffer),
        )
    }

    /// Create a new write of the `memory_space` selection of `buffer`, which holds elements of `caller_type`, to the `file_selection` of `array`.
    ///
    /// If `memory_space` is [`None`], `buffer` holds the array extent and the file selection is used in memory too.
    ///
    /// # Errors
    /// See [`TransferRequest::new_read`].
    pub fn new_write(
        array: &'a RemoteArray,
        file_selection: Selection,
        memory_space: Option<Dataspace>,
        caller_type: DataType,
        buffer: &'a [u8],
    ) -> Result<Self, TransferError> {
        Self::new(
            array,
            file_selection,
            memory_space,
            caller_type,
            CallerBuffer::Write(buffer),
        )
    }

    fn new(
        array: &'a RemoteArray,
        file_selection: Selection,
        memory_space: Option<Dataspace>,
        caller_type: DataType,
        buffer: CallerBuffer<'a>,
    ) -> Result<Self, TransferError> {
        let (file_space, memory_space) =
            resolve_dataspaces(array.shape(), file_selection, memory_space)?;
        let caller_size = caller_type
            .fixed_size()
            .ok_or_else(|| TransferError::VariableSizeCallerType(caller_type.to_string()))?;
        let expected = memory_space.extent_num_elements() as usize * caller_size;
        if buffer.len() != expected {
            return Err(TransferError::InvalidBufferLength {
                got: buffer.len(),
                expected,
            });
        }
        Ok(Self {
            array,
            file_space,
            memory_space,
            caller_type,
            buffer,
            state: TransferState::Init,
            mode: None,
            request: None,
            handle: None,
            retry: RetryState::default(),
            error: None,
        })
    }

    /// Return the target array.
    #[must_use]
    pub fn array(&self) -> &RemoteArray {
        self.array
    }

    /// Return the direction of the transfer.
    #[must_use]
    pub fn direction(&self) -> TransferDirection {
        match self.buffer {
            CallerBuffer::Read(_) => TransferDirection::Read,
            CallerBuffer::Write(_) => TransferDirection::Write,
        }
    }

    /// Return the file dataspace.
    #[must_use]
    pub fn file_space(&self) -> &Dataspace {
        &self.file_space
    }

    /// Return the memory dataspace.
    #[must_use]
    pub fn memory_space(&self) -> &Dataspace {
        &self.memory_space
    }

    /// Return the caller element type.
    #[must_use]
    pub fn caller_type(&self) -> &DataType {
        &self.caller_type
    }

    /// Return the state.
    #[must_use]
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Return the transfer mode, once configured.
    #[must_use]
    pub fn mode(&self) -> Option<TransferMode> {
        self.mode
    }

    /// Return the configured request.
    #[must_use]
    pub fn request(&self) -> Option<&HttpRequest> {
        self.request.as_ref()
    }

    /// Return the transport handle of the current attempt.
    #[must_use]
    pub fn handle(&self) -> Option<TransferHandle> {
        self.handle
    }

    /// Return the retry state.
    #[must_use]
    pub fn retry(&self) -> &RetryState {
        &self.retry
    }

    /// Return the error of a failed transfer.
    #[must_use]
    pub fn error(&self) -> Option<&TransferError> {
        self.error.as_ref()
    }

    fn transition(&mut self, next: TransferState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transfer transition {} -> {next}",
            self.state
        );
        log::debug!(
            "{} of {}: {} -> {next}",
            self.direction(),
            self.array.id(),
            self.state
        );
        self.state = next;
    }

    /// Fail the transfer with `error`.
    pub(crate) fn fail(&mut self, error: TransferError) {
        log::warn!(
            "{} of {} failed after {} attempt(s): {error}",
            self.direction(),
            self.array.id(),
            self.retry.attempt_count()
        );
        self.error = Some(error);
        self.request = None;
        self.handle = None;
        self.transition(TransferState::Failed);
    }

    /// Build the request of the transfer: `Init → Configured`.
    ///
    /// A transfer of zero elements needs no request and succeeds immediately.
    ///
    /// # Errors
    /// Returns a [`TransferError`] if the selection, conversion or payload cannot be encoded.
    pub(crate) fn configure(
        &mut self,
        connection: &ConnectionContext,
        base64_json_writes: bool,
    ) -> Result<(), TransferError> {
        let wire_type = self.array.data_type();
        if wire_type.fixed_size().is_none() {
            return Err(WireCodecError::UnsupportedDataType(wire_type.to_string()).into());
        }
        let num_elements = self.file_space.num_elements_usize()?;
        let selection = self.file_space.selection();
        let mode = choose_transfer_mode_for(wire_type, selection.kind());
        log::debug!(
            "{} of {}: {num_elements} elements of {selection} as {mode}",
            self.direction(),
            self.array.id()
        );

        let request = match &self.buffer {
            CallerBuffer::Read(_) => {
                // validate before any transport call
                ConversionPlan::new(wire_type, &self.caller_type, num_elements, false)?;
                build_read_request(connection, self.array.id(), selection, mode)?
            }
            CallerBuffer::Write(buffer) => {
                let packed = gather(buffer, &self.memory_space, self.caller_type_size())
                    .map_err(WireCodecError::from)?;
                let elements = if needs_conversion(&self.caller_type, wire_type) {
                    let plan =
                        ConversionPlan::new_write(&self.caller_type, wire_type, num_elements)?;
                    Cow::Owned(convert_to_new(
                        &plan,
                        &self.caller_type,
                        wire_type,
                        &packed,
                    )?)
                } else {
                    packed
                };
                let body = encode_write_body(
                    mode,
                    selection,
                    wire_type,
                    self.array.endianness(),
                    &elements,
                    num_elements,
                    base64_json_writes,
                )?;
                let (method, select) = match (selection.kind(), mode) {
                    (SelectionKind::Points, _) => (HttpMethod::Post, None),
                    (SelectionKind::Hyperslab, TransferMode::Binary) => {
                        (HttpMethod::Put, Some(encode_query_param(selection)?))
                    }
                    _ => (HttpMethod::Put, None),
                };
                let url = connection.value_url(self.array.id(), select.as_deref())?;
                let mut request =
                    HttpRequest::new(method, url).with_headers(connection.headers());
                if let Some(content_type) = body.content_type() {
                    request = request.with_header("Content-Type", content_type);
                }
                request.with_body(body.into_bytes())
            }
        };

        self.mode = Some(mode);
        self.transition(TransferState::Configured);
        if num_elements == 0 {
            self.transition(TransferState::Succeeded);
        } else {
            self.request = Some(request);
        }
        Ok(())
    }

    fn caller_type_size(&self) -> usize {
        self.caller_type.fixed_size().unwrap_or_default()
    }

    /// Add the request to `multiplexer`: `Configured | RetryPending → Enqueued`.
    ///
    /// # Errors
    /// Returns a [`TransferError`] if the multiplexer rejects the request.
    pub(crate) fn enqueue<M: Multiplexer + ?Sized>(
        &mut self,
        multiplexer: &mut M,
    ) -> Result<(), TransferError> {
        let request = self
            .request
            .clone()
            .ok_or_else(|| TransportError::InvalidRequest("transfer is not configured".to_string()))?;
        if self.retry.attempt_count() > 0 {
            log::debug!(
                "{} of {}: retry {} to {}",
                self.direction(),
                self.array.id(),
                self.retry.attempt_count(),
                request.url()
            );
        }
        self.handle = Some(multiplexer.add(request)?);
        self.retry.start_attempt();
        self.transition(TransferState::Enqueued);
        Ok(())
    }

    /// Mark an enqueued transfer as executing: `Enqueued → InFlight`.
    pub(crate) fn begin_flight(&mut self) {
        if self.state == TransferState::Enqueued {
            self.transition(TransferState::InFlight);
        }
    }

    /// Returns true if a pending retry is due at `now`.
    pub(crate) fn retry_due(&self, now: Instant) -> bool {
        self.state == TransferState::RetryPending && self.retry.is_due(now)
    }

    /// Handle the completion of the current attempt: `InFlight → Succeeded | RetryPending | Failed`.
    ///
    /// A successful read decodes the response and converts it into the caller buffer.
    pub(crate) fn complete(
        &mut self,
        result: Result<HttpResponse, TransportError>,
        policy: &RetryPolicy,
        now: Instant,
    ) {
        self.handle = None;
        let outcome = result.map_err(TransferError::from).and_then(|response| {
            match classify_status(response.status()) {
                StatusClass::Success => Ok(response),
                StatusClass::Retryable | StatusClass::Fatal => Err(TransferError::status(
                    response.status(),
                    self.request.as_ref().map_or("", HttpRequest::url),
                )),
            }
        });
        let error = match outcome.and_then(|response| self.receive(response)) {
            Ok(()) => {
                self.request = None;
                self.transition(TransferState::Succeeded);
                return;
            }
            Err(error) => error,
        };
        if self.retry.schedule_retry(policy, error, now) {
            if let Some(error) = self.retry.last_error() {
                log::warn!(
                    "{} of {} failed on attempt {}, retrying: {error}",
                    self.direction(),
                    self.array.id(),
                    self.retry.attempt_count()
                );
            }
            self.transition(TransferState::RetryPending);
        } else {
            let error = self
                .retry
                .take_last_error()
                .unwrap_or(TransferError::Incomplete(0));
            self.fail(error);
        }
    }

    /// Decode a successful response into the caller buffer of a read.
    fn receive(&mut self, response: HttpResponse) -> Result<(), TransferError> {
        let CallerBuffer::Read(buffer) = &mut self.buffer else {
            return Ok(());
        };
        let wire_type = self.array.data_type();
        let num_elements = self.file_space.num_elements_usize()?;
        let elements = match self.mode {
            Some(TransferMode::Binary) => decode_binary_payload(
                response.into_body(),
                wire_type,
                self.array.endianness(),
                num_elements,
            )?,
            _ => decode_json_payload(response.body(), wire_type, num_elements)?,
        };
        if needs_conversion(wire_type, &self.caller_type) {
            let plan = ConversionPlan::new(
                wire_type,
                &self.caller_type,
                num_elements,
                self.memory_space.contiguous_region().is_some(),
            )?;
            log::debug!(
                "read of {}: converting {wire_type} to {} reusing {} buffer",
                self.array.id(),
                self.caller_type,
                plan.reuse()
            );
            convert_into_selection(
                &plan,
                wire_type,
                &self.caller_type,
                elements,
                buffer,
                &self.memory_space,
            )?;
        } else {
            let size = self.caller_type.fixed_size().unwrap_or_default();
            scatter(&elements, buffer, &self.memory_space, size).map_err(WireCodecError::from)?;
        }
        Ok(())
    }
}

fn build_read_request(
    connection: &ConnectionContext,
    id: &str,
    selection: &Selection,
    mode: TransferMode,
) -> Result<HttpRequest, TransferError> {
    let request = match selection.kind() {
        SelectionKind::Points => {
            let url = connection.value_url(id, None)?;
            let body = Value::Object(encode_json_body(selection)?).to_string();
            HttpRequest::new(HttpMethod::Post, url)
                .with_headers(connection.headers())
                .with_header("Content-Type", TransferMode::Json.content_type())
                .with_body(body.into_bytes())
        }
        SelectionKind::Hyperslab => {
            let url = connection.value_url(id, Some(&encode_query_param(selection)?))?;
            HttpRequest::new(HttpMethod::Get, url).with_headers(connection.headers())
        }
        SelectionKind::All | SelectionKind::None => {
            HttpRequest::new(HttpMethod::Get, connection.value_url(id, None)?)
                .with_headers(connection.headers())
        }
    };
    Ok(request.with_header("Accept", mode.content_type()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data_type::Endianness, selection::Hyperslab};

    fn connection() -> ConnectionContext {
        ConnectionContext::new("http://localhost:5101")
            .unwrap()
            .with_domain("/home/test/file.h5")
    }

    #[test]
    fn configure_binary_hyperslab_read() {
        let array = RemoteArray::new("d-1", vec![100], DataType::Float64, Endianness::Little);
        let mut buffer = vec![0u8; 5 * 8];
        let memory = Dataspace::new(vec![5]);
        let selection = Hyperslab::new(vec![10], vec![2], vec![5], vec![1]).unwrap();
        let mut transfer = TransferRequest::new_read(
            &array,
            selection.into(),
            Some(memory),
            DataType::Float64,
            &mut buffer,
        )
        .unwrap();
        transfer.configure(&connection(), true).unwrap();
        assert_eq!(transfer.state(), TransferState::Configured);
        assert_eq!(transfer.mode(), Some(TransferMode::Binary));
        let request = transfer.request().unwrap();
        assert_eq!(request.method(), HttpMethod::Get);
        assert_eq!(
            request.url(),
            "http://localhost:5101/datasets/d-1/value?select=[10:19:2]"
        );
        assert_eq!(request.header("Accept"), Some("application/octet-stream"));
        assert_eq!(request.header("Host"), Some("/home/test/file.h5"));
    }

    #[test]
    fn configure_points_write() {
        let array = RemoteArray::new("d-2", vec![4, 5], DataType::Int32, Endianness::Little);
        let buffer: Vec<u8> = bytemuck::cast_slice(&[7i32, 8]).to_vec();
        let points =
            crate::selection::PointSelection::new(2, vec![vec![1, 2], vec![3, 4]]).unwrap();
        let mut transfer = TransferRequest::new_write(
            &array,
            points.into(),
            Some(Dataspace::new(vec![2])),
            DataType::Int32,
            &buffer,
        )
        .unwrap();
        transfer.configure(&connection(), false).unwrap();
        assert_eq!(transfer.mode(), Some(TransferMode::Json));
        let request = transfer.request().unwrap();
        assert_eq!(request.method(), HttpMethod::Post);
        assert_eq!(request.url(), "http://localhost:5101/datasets/d-2/value");
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        let body: Value = serde_json::from_slice(request.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"points": [[1, 2], [3, 4]], "value": [7, 8]})
        );
    }

    #[test]
    fn element_count_mismatch() {
        let array = RemoteArray::new("d-3", vec![10], DataType::UInt8, Endianness::Little);
        let mut buffer = vec![0u8; 4];
        assert!(matches!(
            TransferRequest::new_read(
                &array,
                Selection::All,
                Some(Dataspace::new(vec![4])),
                DataType::UInt8,
                &mut buffer,
            ),
            Err(TransferError::Selection(_))
        ));
        let mut buffer = vec![0u8; 9];
        assert!(matches!(
            TransferRequest::new_read(&array, Selection::All, None, DataType::UInt8, &mut buffer),
            Err(TransferError::InvalidBufferLength { got: 9, expected: 10 })
        ));
    }

    #[test]
    fn empty_transfer_succeeds_without_request() {
        let array = RemoteArray::new("d-4", vec![10], DataType::UInt8, Endianness::Little);
        let buffer = vec![0u8; 10];
        let mut transfer =
            TransferRequest::new_write(&array, Selection::None, None, DataType::UInt8, &buffer)
                .unwrap();
        transfer.configure(&connection(), true).unwrap();
        assert_eq!(transfer.state(), TransferState::Succeeded);
        assert!(transfer.request().is_none());
    }
}
