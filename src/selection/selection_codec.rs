use itertools::{izip, Itertools};
use serde_json::{json, Map, Value};

use super::{Hyperslab, Selection, SelectionError};

/// Encode a selection to one of its two wire forms.
///
/// The query parameter form is the value of the `select=` parameter, e.g. `[10:19:2]`.
/// The JSON body form is a JSON object, e.g. `{"points":[[1,2],[3,4]]}`.
/// [`Selection::All`] and [`Selection::None`] encode to an empty string in either form.
///
/// # Errors
/// Returns a [`SelectionError`] if the selection is zero-dimensional, is a hyperslab that cannot be expressed as `start:stop:step`, or is a point selection requested as a query parameter.
pub fn encode_selection(selection: &Selection, as_query_param: bool) -> Result<String, SelectionError> {
    if as_query_param {
        encode_query_param(selection)
    } else {
        let fields = encode_json_body(selection)?;
        if fields.is_empty() {
            Ok(String::new())
        } else {
            Ok(Value::Object(fields).to_string())
        }
    }
}

/// Encode a selection as the value of a `select=` query parameter.
///
/// Each dimension of a hyperslab encodes to `start:stop:step`, where `stop = start + stride * (count - 1) + block` and `step = stride / block`.
///
/// # Errors
/// See [`encode_selection`].
pub fn encode_query_param(selection: &Selection) -> Result<String, SelectionError> {
    check_dimensionality(selection)?;
    let encoded = match selection {
        Selection::All | Selection::None => String::new(),
        Selection::Points(_) => return Err(SelectionError::PointsAsQueryParam),
        Selection::Hyperslab(hyperslab) => {
            check_representable(hyperslab)?;
            let triples = izip!(hyperslab.start(), hyperslab.end_exc(), hyperslab.step())
                .map(|(start, stop, step)| format!("{start}:{stop}:{step}"))
                .join(",");
            format!("[{triples}]")
        }
    };
    log::trace!("encoded {selection} as query parameter {encoded:?}");
    Ok(encoded)
}

/// Encode a selection as the fields of a JSON request body.
///
/// Hyperslabs produce parallel `start`, `stop`, and `step` arrays.
/// Point selections produce a `points` array of coordinate arrays, or a flat list of indices if one-dimensional.
/// [`Selection::All`] and [`Selection::None`] produce no fields.
///
/// # Errors
/// See [`encode_selection`].
pub fn encode_json_body(selection: &Selection) -> Result<Map<String, Value>, SelectionError> {
    check_dimensionality(selection)?;
    let mut fields = Map::new();
    match selection {
        Selection::All | Selection::None => {}
        Selection::Points(points) => {
            let points = if points.dimensionality() == 1 {
                points.points().iter().map(|point| json!(point[0])).collect()
            } else {
                points.points().iter().map(|point| json!(point)).collect()
            };
            fields.insert("points".to_string(), Value::Array(points));
        }
        Selection::Hyperslab(hyperslab) => {
            check_representable(hyperslab)?;
            fields.insert("start".to_string(), json!(hyperslab.start()));
            fields.insert("stop".to_string(), json!(hyperslab.end_exc()));
            fields.insert("step".to_string(), json!(hyperslab.step()));
        }
    }
    Ok(fields)
}

fn check_dimensionality(selection: &Selection) -> Result<(), SelectionError> {
    if selection.dimensionality() == Some(0) {
        Err(SelectionError::ZeroDimensional)
    } else {
        Ok(())
    }
}

fn check_representable(hyperslab: &Hyperslab) -> Result<(), SelectionError> {
    match hyperslab.first_unrepresentable_dimension() {
        Some(dimension) => Err(SelectionError::Unrepresentable(
            hyperslab.to_string(),
            dimension,
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{Dataspace, PointSelection};

    /// A linear congruential generator for reproducible hyperslabs.
    struct Lcg(u64);

    impl Lcg {
        fn next_below(&mut self, bound: u64) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (self.0 >> 33) % bound
        }
    }

    #[test]
    fn encode_hyperslab_query_param() {
        let selection: Selection = Hyperslab::new(vec![10], vec![2], vec![5], vec![1])
            .unwrap()
            .into();
        assert_eq!(encode_query_param(&selection).unwrap(), "[10:19:2]");
        let selection: Selection = Hyperslab::new_with_ranges(&[1..3, 0..4]).unwrap().into();
        assert_eq!(encode_selection(&selection, true).unwrap(), "[1:3:1,0:4:1]");
    }

    #[test]
    fn encode_hyperslab_json_body() {
        let selection: Selection = Hyperslab::new(vec![0, 4], vec![3, 2], vec![2, 3], vec![3, 2])
            .unwrap()
            .into();
        assert_eq!(
            encode_selection(&selection, false).unwrap(),
            r#"{"start":[0,4],"stop":[6,10],"step":[1,1]}"#
        );
    }

    #[test]
    fn encode_all_none() {
        for selection in [Selection::All, Selection::None] {
            assert_eq!(encode_selection(&selection, true).unwrap(), "");
            assert_eq!(encode_selection(&selection, false).unwrap(), "");
        }
    }

    #[test]
    fn encode_points() {
        let selection: Selection = PointSelection::new(2, vec![vec![1, 2], vec![3, 4]])
            .unwrap()
            .into();
        assert_eq!(
            encode_selection(&selection, false).unwrap(),
            r#"{"points":[[1,2],[3,4]]}"#
        );
        assert!(matches!(
            encode_selection(&selection, true),
            Err(SelectionError::PointsAsQueryParam)
        ));

        let selection: Selection = PointSelection::new(1, vec![vec![7], vec![3]]).unwrap().into();
        assert_eq!(encode_selection(&selection, false).unwrap(), r#"{"points":[7,3]}"#);

        let selection: Selection = PointSelection::new(3, vec![]).unwrap().into();
        assert_eq!(encode_selection(&selection, false).unwrap(), r#"{"points":[]}"#);
    }

    #[test]
    fn encode_unrepresentable_hyperslab() {
        let selection: Selection = Hyperslab::new(vec![0], vec![4], vec![2], vec![2])
            .unwrap()
            .into();
        assert!(matches!(
            encode_selection(&selection, true),
            Err(SelectionError::Unrepresentable(_, 0))
        ));
        assert!(encode_selection(&selection, false).is_err());
    }

    #[test]
    fn encode_single_block_hyperslab() {
        let selection: Selection = Hyperslab::new(vec![2, 1], vec![3, 1], vec![1, 1], vec![1, 4])
            .unwrap()
            .into();
        assert_eq!(encode_query_param(&selection).unwrap(), "[2:3:1,1:5:1]");
    }

    #[test]
    fn encode_hyperslab_round_trip() {
        const EXTENT: u64 = 7;
        let mut rng = Lcg(0x5eed);
        for rank in 1..=4 {
            let shape = vec![EXTENT; rank];
            for _ in 0..200 {
                let (mut start, mut stride, mut count, mut block) =
                    (vec![], vec![], vec![], vec![]);
                while start.len() < rank {
                    let c = 1 + rng.next_below(3);
                    let b = 1 + rng.next_below(3);
                    let s = if b == 1 || c == 1 {
                        1 + rng.next_below(3)
                    } else {
                        b
                    };
                    let extent = s * (c - 1) + b;
                    if extent > EXTENT {
                        continue;
                    }
                    start.push(rng.next_below(EXTENT - extent + 1));
                    stride.push(s);
                    count.push(c);
                    block.push(b);
                }
                let selection: Selection =
                    Hyperslab::new(start, stride, count, block).unwrap().into();
                let encoded = encode_query_param(&selection).unwrap();
                let decoded = encoded
                    .trim_start_matches('[')
                    .trim_end_matches(']')
                    .split(',')
                    .map(|triple| {
                        let (start, stop, step) = triple
                            .split(':')
                            .map(|value| value.parse::<u64>().unwrap())
                            .collect_tuple()
                            .unwrap();
                        (start..stop).step_by(usize::try_from(step).unwrap())
                    })
                    .multi_cartesian_product()
                    .map(|index| index.into_iter().fold(0, |linear, i| linear * EXTENT + i))
                    .collect_vec();
                let expected = Dataspace::new_with_selection(shape.clone(), selection)
                    .unwrap()
                    .linearised_indices()
                    .collect_vec();
                assert_eq!(decoded, expected, "{encoded}");
            }
        }
    }
}
