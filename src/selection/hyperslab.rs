use derive_more::Display;
use itertools::izip;

use super::{ArrayIndices, IncompatibleDimensionalityError, SelectionError};

/// A regular hyperslab.
///
/// Each dimension selects `count` blocks of `block` consecutive elements, the first block starting at `start` and each subsequent block `stride` elements after the previous one.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Display)]
#[display("start {start:?} stride {stride:?} count {count:?} block {block:?}")]
pub struct Hyperslab {
    start: ArrayIndices,
    stride: Vec<u64>,
    count: Vec<u64>,
    block: Vec<u64>,
}

impl Hyperslab {
    /// Create a new hyperslab.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] if
    ///  - the hyperslab is zero-dimensional,
    ///  - `start`, `stride`, `count`, and `block` have differing lengths,
    ///  - any `count` or `block` is zero,
    ///  - any `stride` is less than its `block` (when `count > 1`), or
    ///  - the end or number of elements of the hyperslab exceeds [`u64::MAX`].
    pub fn new(
        start: ArrayIndices,
        stride: Vec<u64>,
        count: Vec<u64>,
        block: Vec<u64>,
    ) -> Result<Self, SelectionError> {
        let rank = start.len();
        if rank == 0 {
            return Err(SelectionError::ZeroDimensional);
        }
        for len in [stride.len(), count.len(), block.len()] {
            if len != rank {
                return Err(IncompatibleDimensionalityError::new(len, rank).into());
            }
        }
        let mut num_elements: u64 = 1;
        for (dimension, (&start, &stride, &count, &block)) in
            izip!(&start, &stride, &count, &block).enumerate()
        {
            if count == 0 || block == 0 {
                return Err(SelectionError::ZeroExtent(dimension));
            }
            if count > 1 && stride < block {
                return Err(SelectionError::OverlappingBlocks {
                    dimension,
                    stride,
                    block,
                });
            }
            let overflow = || SelectionError::Overflow(dimension);
            stride
                .checked_mul(count - 1)
                .and_then(|offset| offset.checked_add(block))
                .and_then(|extent| extent.checked_add(start))
                .ok_or_else(overflow)?;
            num_elements = count
                .checked_mul(block)
                .and_then(|extent| extent.checked_mul(num_elements))
                .ok_or_else(overflow)?;
        }
        Ok(Self {
            start,
            stride,
            count,
            block,
        })
    }

    /// Create a new contiguous hyperslab with `shape` starting at `start`.
    ///
    /// # Errors
    /// See [`Hyperslab::new`].
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: Vec<u64>,
    ) -> Result<Self, SelectionError> {
        let ones = vec![1; start.len()];
        Self::new(start, ones.clone(), shape, ones)
    }

    /// Create a new contiguous hyperslab from a list of per-dimension ranges.
    ///
    /// # Errors
    /// See [`Hyperslab::new`].
    pub fn new_with_ranges(ranges: &[std::ops::Range<u64>]) -> Result<Self, SelectionError> {
        let start = ranges.iter().map(|range| range.start).collect();
        let shape = ranges
            .iter()
            .map(|range| range.end.saturating_sub(range.start))
            .collect();
        Self::new_with_start_shape(start, shape)
    }

    /// Return the start of the hyperslab.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the stride of the hyperslab.
    #[must_use]
    pub fn stride(&self) -> &[u64] {
        &self.stride
    }

    /// Return the block count of the hyperslab.
    #[must_use]
    pub fn count(&self) -> &[u64] {
        &self.count
    }

    /// Return the block size of the hyperslab.
    #[must_use]
    pub fn block(&self) -> &[u64] {
        &self.block
    }

    /// Return the dimensionality of the hyperslab.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the number of selected elements along each dimension.
    #[must_use]
    pub fn shape(&self) -> Vec<u64> {
        std::iter::zip(&self.count, &self.block)
            .map(|(count, block)| count * block)
            .collect()
    }

    /// Return the number of elements of the hyperslab.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        std::iter::zip(&self.count, &self.block)
            .map(|(count, block)| count * block)
            .product()
    }

    /// Return the end (exclusive) of the hyperslab along each dimension.
    ///
    /// This is the `stop` of the wire encoding: `start + stride * (count - 1) + block`.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        izip!(&self.start, &self.stride, &self.count, &self.block)
            .map(|(start, stride, count, block)| start + stride * (count - 1) + block)
            .collect()
    }

    /// Return the step of the wire encoding along each dimension: `stride / block`.
    ///
    /// A dimension with a single block is encoded with a step of one, whatever its stride.
    /// This selects the same elements as `stride / block`, which is zero when a single block is wider than its stride.
    #[must_use]
    pub fn step(&self) -> Vec<u64> {
        izip!(&self.stride, &self.count, &self.block)
            .map(|(stride, &count, block)| if count == 1 { 1 } else { stride / block })
            .collect()
    }

    /// Returns true if the `start:stop:step` wire encoding addresses exactly the elements of this hyperslab.
    #[must_use]
    pub fn is_step_representable(&self) -> bool {
        self.first_unrepresentable_dimension().is_none()
    }

    pub(crate) fn first_unrepresentable_dimension(&self) -> Option<usize> {
        izip!(&self.stride, &self.count, &self.block)
            .position(|(&stride, &count, &block)| block > 1 && count > 1 && stride != block)
    }

    /// Returns true if the hyperslab is within the bounds of `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && std::iter::zip(self.end_exc(), array_shape).all(|(end, &shape)| end <= shape)
    }

    /// Return the selected indices along `dimension` as a list of (start, length) segments.
    pub(crate) fn segments(&self, dimension: usize) -> Vec<(u64, u64)> {
        let (start, stride, count, block) = (
            self.start[dimension],
            self.stride[dimension],
            self.count[dimension],
            self.block[dimension],
        );
        if count == 1 || stride == block {
            vec![(start, count * block)]
        } else {
            (0..count).map(|i| (start + i * stride, block)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyperslab_stop_step() {
        let hyperslab = Hyperslab::new(vec![10], vec![2], vec![5], vec![1]).unwrap();
        assert_eq!(hyperslab.end_exc(), vec![19]);
        assert_eq!(hyperslab.step(), vec![2]);
        assert_eq!(hyperslab.num_elements(), 5);
        assert!(hyperslab.inbounds(&[100]));
        assert!(!hyperslab.inbounds(&[18]));
        assert!(!hyperslab.inbounds(&[100, 1]));
    }

    #[test]
    fn hyperslab_invalid() {
        assert!(matches!(
            Hyperslab::new(vec![], vec![], vec![], vec![]),
            Err(SelectionError::ZeroDimensional)
        ));
        assert!(matches!(
            Hyperslab::new(vec![0, 0], vec![1], vec![1, 1], vec![1, 1]),
            Err(SelectionError::IncompatibleDimensionality(_))
        ));
        assert!(matches!(
            Hyperslab::new(vec![0], vec![1], vec![0], vec![1]),
            Err(SelectionError::ZeroExtent(0))
        ));
        assert!(matches!(
            Hyperslab::new(vec![0, 0], vec![1, 1], vec![1, 2], vec![1, 2]),
            Err(SelectionError::OverlappingBlocks { dimension: 1, .. })
        ));
        // a single block may be wider than its stride
        assert!(Hyperslab::new(vec![0], vec![1], vec![1], vec![4]).is_ok());
    }

    #[test]
    fn hyperslab_overflow() {
        assert!(matches!(
            Hyperslab::new(vec![u64::MAX - 1], vec![1], vec![1], vec![4]),
            Err(SelectionError::Overflow(0))
        ));
        assert!(matches!(
            Hyperslab::new(vec![0, 0], vec![1, u64::MAX / 2], vec![1, 4], vec![1, 1]),
            Err(SelectionError::Overflow(1))
        ));
        assert!(matches!(
            Hyperslab::new(vec![0, 0], vec![1, 1], vec![1 << 32, 1 << 32], vec![1, 1]),
            Err(SelectionError::Overflow(1))
        ));
        let last = Hyperslab::new(vec![u64::MAX - 4], vec![1], vec![1], vec![4]).unwrap();
        assert_eq!(last.end_exc(), vec![u64::MAX]);
        assert!(!last.inbounds(&[10]));
    }

    #[test]
    fn hyperslab_single_block_step() {
        let single = Hyperslab::new(vec![2, 0], vec![3, 1], vec![1, 1], vec![1, 4]).unwrap();
        assert_eq!(single.end_exc(), vec![3, 4]);
        assert_eq!(single.step(), vec![1, 1]);
        assert!(single.is_step_representable());
    }

    #[test]
    fn hyperslab_representable() {
        let blocked = Hyperslab::new(vec![0], vec![4], vec![2], vec![2]).unwrap();
        assert!(!blocked.is_step_representable());
        let tiled = Hyperslab::new(vec![0], vec![2], vec![3], vec![2]).unwrap();
        assert!(tiled.is_step_representable());
        assert_eq!(tiled.end_exc(), vec![6]);
        assert_eq!(tiled.step(), vec![1]);
    }

    #[test]
    fn hyperslab_segments() {
        let hyperslab = Hyperslab::new(vec![1, 2], vec![3, 2], vec![2, 3], vec![2, 2]).unwrap();
        assert_eq!(hyperslab.segments(0), vec![(1, 2), (4, 2)]);
        assert_eq!(hyperslab.segments(1), vec![(2, 6)]);
        assert_eq!(hyperslab.shape(), vec![4, 6]);
    }
}
