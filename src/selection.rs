//! Region selections.
//!
//! A [`Selection`] describes which elements of a multi-dimensional array are addressed by one transfer.
//! A [`Dataspace`] pairs a selection with the extent (shape) of the array it selects from.
//!
//! This module provides:
//!  - iteration over the contiguous linearised runs of a selection, in traversal order, and
//!  - the selection codec ([`encode_selection`], [`encode_query_param`], [`encode_json_body`]) producing the wire forms of a selection.

mod hyperslab;
mod points;
mod selection_codec;
mod selection_iterators;

pub use hyperslab::Hyperslab;
pub use points::PointSelection;
pub use selection_codec::{encode_json_body, encode_query_param, encode_selection};
pub use selection_iterators::ContiguousRunsIterator;

use derive_more::Display;
use thiserror::Error;

/// An array shape. Dimensions may be zero.
pub type ArrayShape = Vec<u64>;

/// An N-dimensional index.
pub type ArrayIndices = Vec<u64>;

/// The kind of a [`Selection`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum SelectionKind {
    /// Every element.
    #[display("all")]
    All,
    /// No elements.
    #[display("none")]
    None,
    /// An explicit list of points.
    #[display("points")]
    Points,
    /// A regular hyperslab.
    #[display("hyperslab")]
    Hyperslab,
}

/// A region selection.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum Selection {
    /// Select every element of the extent.
    #[display("all")]
    All,
    /// Select no elements.
    #[display("none")]
    None,
    /// Select an ordered list of points.
    #[display("points {_0}")]
    Points(PointSelection),
    /// Select a regular hyperslab.
    #[display("hyperslab {_0}")]
    Hyperslab(Hyperslab),
}

impl Selection {
    /// Return the kind of the selection.
    #[must_use]
    pub fn kind(&self) -> SelectionKind {
        match self {
            Self::All => SelectionKind::All,
            Self::None => SelectionKind::None,
            Self::Points(_) => SelectionKind::Points,
            Self::Hyperslab(_) => SelectionKind::Hyperslab,
        }
    }

    /// Return the dimensionality of the selection, if it is defined independently of an extent.
    #[must_use]
    pub fn dimensionality(&self) -> Option<usize> {
        match self {
            Self::All | Self::None => None,
            Self::Points(points) => Some(points.dimensionality()),
            Self::Hyperslab(hyperslab) => Some(hyperslab.dimensionality()),
        }
    }
}

impl From<Hyperslab> for Selection {
    fn from(hyperslab: Hyperslab) -> Self {
        Self::Hyperslab(hyperslab)
    }
}

impl From<PointSelection> for Selection {
    fn from(points: PointSelection) -> Self {
        Self::Points(points)
    }
}

/// An array extent with a selection over it.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Display)]
#[display("{selection} of shape {shape:?}")]
pub struct Dataspace {
    shape: ArrayShape,
    selection: Selection,
}

impl Dataspace {
    /// Create a new dataspace with `shape` and every element selected.
    #[must_use]
    pub fn new(shape: ArrayShape) -> Self {
        Self {
            shape,
            selection: Selection::All,
        }
    }

    /// Create a new scalar (zero-dimensional, single element) dataspace.
    #[must_use]
    pub fn new_scalar() -> Self {
        Self::new(vec![])
    }

    /// Create a new dataspace with `shape` and `selection`.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] if the `selection` dimensionality does not match `shape` or it is out of bounds.
    pub fn new_with_selection(
        shape: ArrayShape,
        selection: Selection,
    ) -> Result<Self, SelectionError> {
        let mut dataspace = Self::new(shape);
        dataspace.select(selection)?;
        Ok(dataspace)
    }

    /// Replace the selection of the dataspace.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] if the `selection` dimensionality does not match the dataspace or it is out of bounds.
    pub fn select(&mut self, selection: Selection) -> Result<(), SelectionError> {
        if let Some(dimensionality) = selection.dimensionality() {
            if dimensionality != self.shape.len() {
                return Err(
                    IncompatibleDimensionalityError::new(dimensionality, self.shape.len()).into(),
                );
            }
        }
        let inbounds = match &selection {
            Selection::All | Selection::None => true,
            Selection::Points(points) => points.inbounds(&self.shape),
            Selection::Hyperslab(hyperslab) => hyperslab.inbounds(&self.shape),
        };
        if inbounds {
            self.selection = selection;
            Ok(())
        } else {
            Err(SelectionError::OutOfBounds(
                selection.to_string(),
                self.shape.clone(),
            ))
        }
    }

    /// Return the shape of the dataspace.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the selection of the dataspace.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Return the dimensionality of the dataspace.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// Return the number of elements in the extent of the dataspace.
    #[must_use]
    pub fn extent_num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the number of selected elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        match &self.selection {
            Selection::All => self.extent_num_elements(),
            Selection::None => 0,
            Selection::Points(points) => points.num_elements(),
            Selection::Hyperslab(hyperslab) => hyperslab.num_elements(),
        }
    }

    /// Return the number of selected elements as a `usize`.
    ///
    /// # Errors
    /// Returns [`SelectionError::TooLarge`] if the number of elements exceeds [`usize::MAX`].
    pub fn num_elements_usize(&self) -> Result<usize, SelectionError> {
        let num_elements = self.num_elements();
        usize::try_from(num_elements).map_err(|_| SelectionError::TooLarge(num_elements))
    }

    /// Returns an iterator over the contiguous linearised runs of the selection.
    #[must_use]
    pub fn contiguous_runs(&self) -> ContiguousRunsIterator {
        ContiguousRunsIterator::new(self)
    }

    /// Returns the single contiguous run (linearised index, # elements) covering the selection, if there is one.
    ///
    /// An empty selection is contiguous, with a run of zero elements.
    #[must_use]
    pub fn contiguous_region(&self) -> Option<(u64, u64)> {
        let mut runs = self.contiguous_runs();
        match (runs.next(), runs.next()) {
            (None, _) => Some((0, 0)),
            (Some(run), None) => Some(run),
            (Some(_), Some(_)) => None,
        }
    }

    /// Returns an iterator over the linearised indices of selected elements, in traversal order.
    pub fn linearised_indices(&self) -> impl Iterator<Item = u64> {
        self.contiguous_runs()
            .flat_map(|(start, length)| start..start + length)
    }
}

/// Check that two dataspaces select the same number of elements, returning that number.
///
/// # Errors
/// Returns [`SelectionError::ElementCountMismatch`] if the selected element counts differ.
pub fn check_element_counts(
    source: &Dataspace,
    destination: &Dataspace,
) -> Result<u64, SelectionError> {
    let (source_count, destination_count) = (source.num_elements(), destination.num_elements());
    if source_count == destination_count {
        Ok(source_count)
    } else {
        Err(SelectionError::ElementCountMismatch(
            source_count,
            destination_count,
        ))
    }
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// A selection error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum SelectionError {
    /// A zero-dimensional selection.
    #[error("selections must have at least one dimension")]
    ZeroDimensional,
    /// An incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// A hyperslab with a zero count or block.
    #[error("hyperslab has a zero extent in dimension {0}")]
    ZeroExtent(usize),
    /// A hyperslab whose blocks overlap.
    #[error("hyperslab stride {stride} is less than its block {block} in dimension {dimension}")]
    OverlappingBlocks {
        /// The dimension.
        dimension: usize,
        /// The stride.
        stride: u64,
        /// The block.
        block: u64,
    },
    /// A hyperslab whose end or element count exceeds [`u64::MAX`].
    #[error("hyperslab extent overflows in dimension {0}")]
    Overflow(usize),
    /// A hyperslab that cannot be encoded as a `start:stop:step` triple.
    #[error("hyperslab {0} cannot be expressed as start:stop:step in dimension {1}")]
    Unrepresentable(String, usize),
    /// A selection outside of its extent.
    #[error("selection {0} is out of bounds of shape {1:?}")]
    OutOfBounds(String, ArrayShape),
    /// A point selection requested as a query parameter.
    #[error("point selections cannot be encoded as a query parameter")]
    PointsAsQueryParam,
    /// The source and destination select differing numbers of elements.
    #[error("source selects {0} elements, destination selects {1} elements")]
    ElementCountMismatch(u64, u64),
    /// A selection too large to address in memory.
    #[error("selection of {0} elements is too large")]
    TooLarge(u64),
}
