use std::iter::FusedIterator;

use super::{Dataspace, Hyperslab, Selection};

/// Iterates over maximal runs of contiguous linearised element indices in a [`Dataspace`] selection.
///
/// The iterator item is a tuple: (linearised index, # contiguous elements).
/// Runs are produced in selection traversal order: row-major for hyperslabs, list order for points.
/// Adjacent runs are merged, so a selection covering one contiguous region yields exactly one item.
pub struct ContiguousRunsIterator {
    source: RunSource,
    pending: Option<(u64, u64)>,
}

enum RunSource {
    Single(Option<(u64, u64)>),
    Points(std::vec::IntoIter<u64>),
    Hyperslab(HyperslabRuns),
}

impl RunSource {
    fn next(&mut self) -> Option<(u64, u64)> {
        match self {
            Self::Single(run) => run.take(),
            Self::Points(linear) => linear.next().map(|index| (index, 1)),
            Self::Hyperslab(runs) => runs.next(),
        }
    }
}

/// Odometer over the outer dimensions of a hyperslab, emitting the innermost dimension segments.
struct HyperslabRuns {
    outer: Vec<Vec<u64>>,
    outer_strides: Vec<u64>,
    inner: Vec<(u64, u64)>,
    positions: Vec<usize>,
    base: u64,
    segment: usize,
    done: bool,
}

impl HyperslabRuns {
    fn new(hyperslab: &Hyperslab, array_shape: &[u64]) -> Self {
        let rank = hyperslab.dimensionality();
        let strides = linear_strides(array_shape);
        let outer: Vec<Vec<u64>> = (0..rank - 1)
            .map(|dimension| {
                hyperslab
                    .segments(dimension)
                    .into_iter()
                    .flat_map(|(start, length)| start..start + length)
                    .collect()
            })
            .collect();
        let mut runs = Self {
            outer_strides: strides[..rank - 1].to_vec(),
            inner: hyperslab.segments(rank - 1),
            positions: vec![0; rank - 1],
            base: 0,
            segment: 0,
            done: outer.iter().any(Vec::is_empty),
            outer,
        };
        runs.base = runs.current_base();
        runs
    }

    fn current_base(&self) -> u64 {
        itertools::izip!(&self.outer, &self.positions, &self.outer_strides)
            .map(|(indices, &position, stride)| indices[position] * stride)
            .sum()
    }

    fn next(&mut self) -> Option<(u64, u64)> {
        while !self.done {
            if let Some(&(start, length)) = self.inner.get(self.segment) {
                self.segment += 1;
                return Some((self.base + start, length));
            }
            self.segment = 0;
            let mut dimension = self.positions.len();
            loop {
                if dimension == 0 {
                    self.done = true;
                    return None;
                }
                dimension -= 1;
                self.positions[dimension] += 1;
                if self.positions[dimension] < self.outer[dimension].len() {
                    break;
                }
                self.positions[dimension] = 0;
            }
            self.base = self.current_base();
        }
        None
    }
}

/// Return the row-major element strides of `array_shape`.
pub(crate) fn linear_strides(array_shape: &[u64]) -> Vec<u64> {
    let mut strides = vec![1; array_shape.len()];
    for dimension in (0..array_shape.len().saturating_sub(1)).rev() {
        strides[dimension] = strides[dimension + 1] * array_shape[dimension + 1];
    }
    strides
}

impl ContiguousRunsIterator {
    pub(super) fn new(dataspace: &Dataspace) -> Self {
        let source = match dataspace.selection() {
            Selection::All => {
                let num_elements = dataspace.extent_num_elements();
                RunSource::Single((num_elements > 0).then_some((0, num_elements)))
            }
            Selection::None => RunSource::Single(None),
            Selection::Points(points) => {
                let strides = linear_strides(dataspace.shape());
                let linear: Vec<u64> = points
                    .points()
                    .iter()
                    .map(|point| std::iter::zip(point, &strides).map(|(i, s)| i * s).sum())
                    .collect();
                RunSource::Points(linear.into_iter())
            }
            Selection::Hyperslab(hyperslab) => {
                RunSource::Hyperslab(HyperslabRuns::new(hyperslab, dataspace.shape()))
            }
        };
        let mut iterator = Self {
            source,
            pending: None,
        };
        iterator.pending = iterator.source.next();
        iterator
    }
}

impl Iterator for ContiguousRunsIterator {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let (start, mut length) = self.pending.take()?;
        loop {
            match self.source.next() {
                Some((next_start, next_length)) if next_start == start + length => {
                    length += next_length;
                }
                next => {
                    self.pending = next;
                    break;
                }
            }
        }
        Some((start, length))
    }
}

impl FusedIterator for ContiguousRunsIterator {}
