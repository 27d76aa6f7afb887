//! Bulk read and write entry points.
//!
//! A [`RemoteArray`] is the client-side view of a dataset in the array store: its opaque id, shape, and wire element type.
//! An [`ArrayClient`] reads and writes selections of remote arrays, one [`TransferRequest`] per array, through its [`TransferScheduler`].
//!
//! ```
//! # use restvol::{client::{ArrayClient, RemoteArray}, data_type::{DataType, Endianness}, selection::{Hyperslab, Selection}};
//! # use restvol::transport::{Completion, ConnectionContext, HttpRequest, HttpResponse, Multiplexer, TransferHandle, TransportError};
//! # struct Echo(Vec<Completion>);
//! # impl Multiplexer for Echo {
//! #     fn add(&mut self, request: HttpRequest) -> Result<TransferHandle, TransportError> {
//! #         let handle = TransferHandle::new(self.0.len() as u64);
//! #         self.0.push((handle, Ok(HttpResponse::new(200, vec![0; 5 * 8]))));
//! #         Ok(handle)
//! #     }
//! #     fn poll(&mut self, _timeout: std::time::Duration) -> Vec<Completion> { std::mem::take(&mut self.0) }
//! #     fn pending(&self) -> usize { self.0.len() }
//! # }
//! # let multiplexer = Echo(vec![]);
//! let connection = ConnectionContext::new("http://localhost:5101")?.with_domain("/home/test/file.h5");
//! let mut client = ArrayClient::new(multiplexer, connection);
//! let array = RemoteArray::from_descriptors(
//!     "d-1",
//!     &serde_json::json!({"class": "H5T_FLOAT", "base": "H5T_IEEE_F64LE"}),
//!     &serde_json::json!({"class": "H5S_SIMPLE", "dims": [100]}),
//! )?;
//! let selection: Selection = Hyperslab::new(vec![10], vec![2], vec![5], vec![1])?.into();
//! let values: Vec<f32> = client.read_elements(&array, selection, &DataType::Float32)?;
//! assert_eq!(values.len(), 5);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

use serde_json::Value;
use thiserror::Error;

use crate::{
    data_type::{
        parse_shape_descriptor, parse_type_descriptor, DataType, DataTypeMetadataError, Endianness,
    },
    scheduler::{SchedulerOptions, TransferScheduler, TransferSummary},
    selection::{ArrayShape, Dataspace, Selection},
    transfer::{BulkTransferError, TransferError, TransferRequest},
    transport::{ConnectionContext, Multiplexer},
};

/// A dataset in the array store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteArray {
    id: String,
    shape: ArrayShape,
    data_type: DataType,
    endianness: Endianness,
}

impl RemoteArray {
    /// Create a new remote array with the opaque identifier `id`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        shape: ArrayShape,
        data_type: DataType,
        endianness: Endianness,
    ) -> Self {
        Self {
            id: id.into(),
            shape,
            data_type,
            endianness,
        }
    }

    /// Create a new remote array from its JSON type and shape descriptors.
    ///
    /// # Errors
    /// Returns a [`DataTypeMetadataError`] if either descriptor is invalid.
    pub fn from_descriptors(
        id: impl Into<String>,
        type_descriptor: &Value,
        shape_descriptor: &Value,
    ) -> Result<Self, DataTypeMetadataError> {
        let (data_type, endianness) = parse_type_descriptor(type_descriptor)?;
        let shape = parse_shape_descriptor(shape_descriptor)?;
        Ok(Self::new(id, shape, data_type, endianness))
    }

    /// Return the identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return the shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the wire element type.
    #[must_use]
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Return the wire byte order.
    #[must_use]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Return the dimensionality.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// Return the number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }
}

/// An element type with a native [`DataType`].
pub trait NativeElement: bytemuck::Pod {
    /// The data type of the element.
    const DATA_TYPE: DataType;
}

macro_rules! impl_native_element {
    ($($t:ty => $data_type:ident),*) => {
        $(
            impl NativeElement for $t {
                const DATA_TYPE: DataType = DataType::$data_type;
            }
        )*
    };
}

impl_native_element!(
    i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64,
    u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64,
    f32 => Float32, f64 => Float64
);

/// An array client error.
#[derive(Clone, Debug, Error)]
pub enum ArrayClientError {
    /// A transfer that could not be created.
    #[error(transparent)]
    Transfer(#[from] TransferError),
    /// A failed bulk transfer.
    #[error(transparent)]
    Bulk(#[from] BulkTransferError),
    /// An element type whose size does not match its caller data type.
    #[error("element size {0} does not match the size of data type {1}")]
    IncompatibleElementSize(usize, String),
}

/// Reads and writes remote arrays.
#[derive(Debug)]
pub struct ArrayClient<M: Multiplexer> {
    scheduler: TransferScheduler<M>,
}

#[cfg(feature = "http")]
impl ArrayClient<crate::transport::ReqwestMultiplexer> {
    /// Create a new client for the array store at `base_url`, addressing `domain`, over HTTP.
    ///
    /// # Errors
    /// Returns a [`TransportError`](crate::transport::TransportError) if `base_url` is invalid or the HTTP client cannot be created.
    pub fn new_http(
        base_url: &str,
        domain: &str,
    ) -> Result<Self, crate::transport::TransportError> {
        let connection = ConnectionContext::new(base_url)?.with_domain(domain);
        Ok(Self::new(
            crate::transport::ReqwestMultiplexer::new()?,
            connection,
        ))
    }
}

impl<M: Multiplexer> ArrayClient<M> {
    /// Create a new client with default scheduler options.
    #[must_use]
    pub fn new(multiplexer: M, connection: ConnectionContext) -> Self {
        Self {
            scheduler: TransferScheduler::new(multiplexer, connection),
        }
    }

    /// Create a new client with scheduler `options`.
    #[must_use]
    pub fn new_with_options(
        multiplexer: M,
        connection: ConnectionContext,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            scheduler: TransferScheduler::new_with_options(multiplexer, connection, options),
        }
    }

    /// Return the scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &TransferScheduler<M> {
        &self.scheduler
    }

    /// Return a mutable reference to the scheduler.
    #[must_use]
    pub fn scheduler_mut(&mut self) -> &mut TransferScheduler<M> {
        &mut self.scheduler
    }

    /// Execute a bulk call of `transfers`, one per target array, blocking until all are terminal.
    ///
    /// # Errors
    /// Returns a [`BulkTransferError`] if any transfer failed. Other transfers are still completed.
    pub fn execute(
        &mut self,
        transfers: &mut [TransferRequest<'_>],
    ) -> Result<TransferSummary, BulkTransferError> {
        self.scheduler.execute(transfers)
    }

    /// Read the `file_selection` of `array` into the `memory_space` selection of `buffer`, which holds elements of `caller_type`.
    ///
    /// If `memory_space` is [`None`], `buffer` holds the array extent and receives the elements of the file selection at the same positions.
    ///
    /// # Errors
    /// Returns an [`ArrayClientError`] if the transfer is invalid or fails.
    pub fn read(
        &mut self,
        array: &RemoteArray,
        file_selection: Selection,
        memory_space: Option<Dataspace>,
        caller_type: &DataType,
        buffer: &mut [u8],
    ) -> Result<TransferSummary, ArrayClientError> {
        let transfer = TransferRequest::new_read(
            array,
            file_selection,
            memory_space,
            caller_type.clone(),
            buffer,
        )?;
        Ok(self.execute(&mut [transfer])?)
    }

    /// Write the `memory_space` selection of `buffer`, which holds elements of `caller_type`, to the `file_selection` of `array`.
    ///
    /// If `memory_space` is [`None`], `buffer` holds the array extent and the elements of the file selection are written from the same positions.
    ///
    /// # Errors
    /// Returns an [`ArrayClientError`] if the transfer is invalid or fails.
    pub fn write(
        &mut self,
        array: &RemoteArray,
        file_selection: Selection,
        memory_space: Option<Dataspace>,
        caller_type: &DataType,
        buffer: &[u8],
    ) -> Result<TransferSummary, ArrayClientError> {
        let transfer = TransferRequest::new_write(
            array,
            file_selection,
            memory_space,
            caller_type.clone(),
            buffer,
        )?;
        Ok(self.execute(&mut [transfer])?)
    }

    /// Read the `file_selection` of `array` as a packed vector of elements of `caller_type`.
    ///
    /// # Errors
    /// Returns [`ArrayClientError::IncompatibleElementSize`] if the size of `T` does not match `caller_type`, see also [`ArrayClient::read`].
    pub fn read_elements<T: bytemuck::Pod>(
        &mut self,
        array: &RemoteArray,
        file_selection: Selection,
        caller_type: &DataType,
    ) -> Result<Vec<T>, ArrayClientError> {
        check_element_size::<T>(caller_type)?;
        let file_space = Dataspace::new_with_selection(array.shape().to_vec(), file_selection)
            .map_err(TransferError::from)?;
        let num_elements = file_space.num_elements_usize().map_err(TransferError::from)?;
        let mut elements = vec![T::zeroed(); num_elements];
        self.read(
            array,
            file_space.selection().clone(),
            Some(Dataspace::new(vec![num_elements as u64])),
            caller_type,
            bytemuck::cast_slice_mut(&mut elements),
        )?;
        Ok(elements)
    }

    /// Write packed `elements` of `caller_type` to the `file_selection` of `array`.
    ///
    /// # Errors
    /// Returns [`ArrayClientError::IncompatibleElementSize`] if the size of `T` does not match `caller_type`, see also [`ArrayClient::write`].
    pub fn write_elements<T: bytemuck::Pod>(
        &mut self,
        array: &RemoteArray,
        file_selection: Selection,
        caller_type: &DataType,
        elements: &[T],
    ) -> Result<TransferSummary, ArrayClientError> {
        check_element_size::<T>(caller_type)?;
        self.write(
            array,
            file_selection,
            Some(Dataspace::new(vec![elements.len() as u64])),
            caller_type,
            bytemuck::cast_slice(elements),
        )
    }

    /// Read the `file_selection` of `array` as a vector of native elements.
    ///
    /// # Errors
    /// See [`ArrayClient::read_elements`].
    pub fn read_native<T: NativeElement>(
        &mut self,
        array: &RemoteArray,
        file_selection: Selection,
    ) -> Result<Vec<T>, ArrayClientError> {
        self.read_elements(array, file_selection, &T::DATA_TYPE)
    }

    /// Write native elements to the `file_selection` of `array`.
    ///
    /// # Errors
    /// See [`ArrayClient::write_elements`].
    pub fn write_native<T: NativeElement>(
        &mut self,
        array: &RemoteArray,
        file_selection: Selection,
        elements: &[T],
    ) -> Result<TransferSummary, ArrayClientError> {
        self.write_elements(array, file_selection, &T::DATA_TYPE, elements)
    }
}

fn check_element_size<T>(caller_type: &DataType) -> Result<(), ArrayClientError> {
    if caller_type.fixed_size() == Some(std::mem::size_of::<T>()) {
        Ok(())
    } else {
        Err(ArrayClientError::IncompatibleElementSize(
            std::mem::size_of::<T>(),
            caller_type.to_string(),
        ))
    }
}
