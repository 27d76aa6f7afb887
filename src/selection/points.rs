use derive_more::Display;

use super::{ArrayIndices, IncompatibleDimensionalityError, SelectionError};

/// An ordered list of element coordinates.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Display)]
#[display("{points:?}")]
pub struct PointSelection {
    rank: usize,
    points: Vec<ArrayIndices>,
}

impl PointSelection {
    /// Create a new point selection of dimensionality `rank`.
    ///
    /// An empty list of points is valid and selects no elements.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] if `rank` is zero or any point does not have `rank` coordinates.
    pub fn new(rank: usize, points: Vec<ArrayIndices>) -> Result<Self, SelectionError> {
        if rank == 0 {
            return Err(SelectionError::ZeroDimensional);
        }
        if let Some(point) = points.iter().find(|point| point.len() != rank) {
            return Err(IncompatibleDimensionalityError::new(point.len(), rank).into());
        }
        Ok(Self { rank, points })
    }

    /// Return the dimensionality of the points.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.rank
    }

    /// Return the points.
    #[must_use]
    pub fn points(&self) -> &[ArrayIndices] {
        &self.points
    }

    /// Return the number of selected elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.points.len() as u64
    }

    /// Returns true if every point is within the bounds of `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        self.rank == array_shape.len()
            && self
                .points
                .iter()
                .all(|point| std::iter::zip(point, array_shape).all(|(index, shape)| index < shape))
    }
}
