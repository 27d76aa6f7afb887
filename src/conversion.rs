//! The type conversion arbiter.
//!
//! Decides whether the caller element type and the wire element type differ and, if so, plans scratch buffer allocation and reuse ([`ConversionPlan`]) and performs the conversion.
//!
//! On the read path, wire elements are converted into the caller's destination selection with [`convert_into_selection`].
//! On the write path, caller elements are converted into a fresh outgoing buffer with [`convert_to_new`]; the caller's buffer is never mutated.

mod conversion_plan;
mod convert;

pub use conversion_plan::{BufferReuse, ConversionPlan};
pub use convert::NumericValue;

use thiserror::Error;

use crate::{
    data_type::DataType,
    selection::Dataspace,
    wire::{gather, scatter, IncompatibleBufferLengthError},
};

/// Returns true if elements of `caller_type` and `wire_type` are not bit-identical.
#[must_use]
pub fn needs_conversion(caller_type: &DataType, wire_type: &DataType) -> bool {
    caller_type != wire_type
}

/// A conversion error.
#[derive(Clone, Debug, Error)]
pub enum ConversionError {
    /// A conversion between incompatible classes.
    #[error("unsupported conversion from {0} to {1}")]
    Unsupported(String, String),
    /// A conversion involving a variable size data type.
    #[error("cannot convert variable size data type {0}")]
    VariableSize(String),
    /// A write conversion that would leave wire members without a value.
    #[error("writing {0} as {1} would leave wire members unset")]
    PartialWrite(String, String),
    /// A destination that cannot be reused as planned.
    #[error("the destination selection is not contiguous and cannot be reused as a {0} buffer")]
    NonContiguousReuse(BufferReuse),
    /// A buffer of the wrong length.
    #[error(transparent)]
    BufferLength(#[from] IncompatibleBufferLengthError),
}

/// Convert packed `elements` of `src_type` into a fresh buffer of `dst_type` elements.
///
/// # Errors
/// Returns [`ConversionError::BufferLength`] if `elements` does not hold the number of elements in `plan`.
pub fn convert_to_new(
    plan: &ConversionPlan,
    src_type: &DataType,
    dst_type: &DataType,
    elements: &[u8],
) -> Result<Vec<u8>, ConversionError> {
    let (src_size, dst_size) = (plan.src_size(), plan.dst_size());
    check_length(elements.len(), src_size * plan.num_elements())?;
    let mut converted = vec![0u8; plan.dst_buffer_size()];
    if dst_size > 0 {
        for (src, dst) in std::iter::zip(
            elements.chunks_exact(src_size),
            converted.chunks_exact_mut(dst_size),
        ) {
            convert::convert_element(src_type, dst_type, src, dst);
        }
    }
    Ok(converted)
}

/// Convert packed `elements` of `src_type` into the `destination_space` selection of `destination`, which holds `dst_type` elements.
///
/// `elements` is consumed as scratch space.
/// The destination is reused as the conversion or background buffer as decided by `plan`; otherwise converted elements are scattered into the destination selection.
/// The result is identical for every reuse decision.
///
/// # Errors
/// Returns a [`ConversionError`] if a buffer length is incompatible with the plan, or the plan reuses a non-contiguous destination.
pub fn convert_into_selection(
    plan: &ConversionPlan,
    src_type: &DataType,
    dst_type: &DataType,
    mut elements: Vec<u8>,
    destination: &mut [u8],
    destination_space: &Dataspace,
) -> Result<(), ConversionError> {
    let (dst_size, num_elements) = (plan.dst_size(), plan.num_elements());
    check_length(elements.len(), plan.src_size() * num_elements)?;
    check_length(
        destination_space.num_elements() as usize,
        num_elements,
    )?;
    if num_elements == 0 {
        return Ok(());
    }

    match plan.reuse() {
        BufferReuse::None => {
            elements.resize(plan.conversion_buffer_size(), 0);
            let background = if plan.fill_background() {
                Some(gather(destination, destination_space, dst_size)?.into_owned())
            } else if plan.need_background() {
                Some(vec![0u8; plan.dst_buffer_size()])
            } else {
                None
            };
            convert::convert_in_place(
                src_type,
                dst_type,
                &mut elements,
                num_elements,
                background.as_deref(),
            );
            scatter(
                &elements[..plan.dst_buffer_size()],
                destination,
                destination_space,
                dst_size,
            )?;
        }
        BufferReuse::Conversion => {
            let region = contiguous_region(plan, destination, destination_space)?;
            let background = if plan.fill_background() {
                Some(region.to_vec())
            } else if plan.need_background() {
                Some(vec![0u8; plan.dst_buffer_size()])
            } else {
                None
            };
            region[..elements.len()].copy_from_slice(&elements);
            convert::convert_in_place(
                src_type,
                dst_type,
                region,
                num_elements,
                background.as_deref(),
            );
        }
        BufferReuse::Background => {
            let region = contiguous_region(plan, destination, destination_space)?;
            elements.resize(plan.conversion_buffer_size(), 0);
            convert::convert_in_place(
                src_type,
                dst_type,
                &mut elements,
                num_elements,
                Some(&*region),
            );
            region.copy_from_slice(&elements[..plan.dst_buffer_size()]);
        }
    }
    Ok(())
}

fn contiguous_region<'a>(
    plan: &ConversionPlan,
    destination: &'a mut [u8],
    destination_space: &Dataspace,
) -> Result<&'a mut [u8], ConversionError> {
    let (start, _) = destination_space
        .contiguous_region()
        .ok_or(ConversionError::NonContiguousReuse(plan.reuse()))?;
    check_length(
        destination.len(),
        destination_space.extent_num_elements() as usize * plan.dst_size(),
    )?;
    let start = start as usize * plan.dst_size();
    Ok(&mut destination[start..start + plan.dst_buffer_size()])
}

fn check_length(got: usize, expected: usize) -> Result<(), IncompatibleBufferLengthError> {
    if got == expected {
        Ok(())
    } else {
        Err(IncompatibleBufferLengthError::new(got, expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_type::{CompoundMember, CompoundType},
        selection::Hyperslab,
    };

    fn compound(members: &[(&str, DataType)]) -> DataType {
        DataType::Compound(
            CompoundType::new(
                members
                    .iter()
                    .map(|(name, data_type)| ((*name).to_string(), data_type.clone()))
                    .collect(),
            )
            .unwrap(),
        )
    }

    /// Source elements with a recognisable pattern: element `i` has every numeric member equal to `i + 1`.
    fn pattern(data_type: &DataType, num_elements: usize) -> Vec<u8> {
        let size = data_type.fixed_size().unwrap();
        let mut bytes = vec![0u8; size * num_elements];
        for (i, element) in bytes.chunks_exact_mut(size).enumerate() {
            fill_element(data_type, element, i as i64 + 1);
        }
        bytes
    }

    fn fill_element(data_type: &DataType, element: &mut [u8], value: i64) {
        match data_type {
            DataType::Compound(compound) => {
                for member in compound.members() {
                    fill_element(
                        member.data_type(),
                        &mut element[member.offset()..member.offset() + member.size()],
                        value,
                    );
                }
            }
            _ => {
                NumericValue::Signed(value).write(data_type, element).unwrap();
            }
        }
    }

    fn run(plan: &ConversionPlan, src: &DataType, dst: &DataType, n: usize) -> Vec<u8> {
        let space = Dataspace::new(vec![n as u64]);
        // pre-existing destination values
        let mut destination: Vec<u8> = (0..plan.dst_buffer_size()).map(|i| (i % 251) as u8).collect();
        convert_into_selection(plan, src, dst, pattern(src, n), &mut destination, &space).unwrap();
        destination
    }

    #[test]
    fn conversion_buffer_safety() {
        let wire_compound = compound(&[
            ("a", DataType::Int32),
            ("b", DataType::Float64),
            ("c", DataType::Int16),
        ]);
        let padded = DataType::Compound(
            CompoundType::new_with_layout(
                vec![
                    CompoundMember::new("c", 0, DataType::Int64),
                    CompoundMember::new("a", 12, DataType::Int8),
                ],
                16,
            )
            .unwrap(),
        );
        let pairs = [
            (DataType::Float32, DataType::Float64),
            (DataType::Float64, DataType::Float32),
            (DataType::Int16, DataType::UInt16),
            (DataType::UInt8, DataType::Int64),
            (wire_compound.clone(), compound(&[("b", DataType::Float32)])),
            (wire_compound.clone(), compound(&[("c", DataType::Int64), ("a", DataType::Int64)])),
            (wire_compound.clone(), compound(&[("a", DataType::Int32), ("z", DataType::UInt8)])),
            (compound(&[("a", DataType::Int8)]), wire_compound.clone()),
            (wire_compound, padded),
        ];
        let n = 7;
        for (src, dst) in &pairs {
            let fresh = ConversionPlan::new(src, dst, n, false).unwrap();
            assert_eq!(fresh.reuse(), BufferReuse::None);
            let expected = run(&fresh, src, dst, n);

            let planned = ConversionPlan::new(src, dst, n, true).unwrap();
            assert_eq!(run(&planned, src, dst, n), expected, "{src} -> {dst}");

            if fresh.dst_size() >= fresh.src_size() {
                let plan = fresh.clone().with_reuse(BufferReuse::Conversion);
                assert_eq!(run(&plan, src, dst, n), expected, "{src} -> {dst} (conversion)");
            }
            if fresh.need_background() {
                let plan = fresh.clone().with_reuse(BufferReuse::Background);
                assert_eq!(run(&plan, src, dst, n), expected, "{src} -> {dst} (background)");
            }
        }
    }

    #[test]
    fn convert_into_noncontiguous_selection() {
        let src = compound(&[("a", DataType::Int32)]);
        let dst = compound(&[("a", DataType::Int16), ("keep", DataType::UInt8)]);
        // select elements 1 and 3 of 4
        let space = Dataspace::new_with_selection(
            vec![4],
            Hyperslab::new(vec![1], vec![2], vec![2], vec![1]).unwrap().into(),
        )
        .unwrap();
        let plan = ConversionPlan::new(&src, &dst, 2, space.contiguous_region().is_some()).unwrap();
        assert_eq!(plan.reuse(), BufferReuse::None);
        assert!(plan.fill_background());
        let mut destination = vec![9u8; 4 * 3];
        let elements: Vec<u8> = bytemuck::cast_slice(&[10i32, -20]).to_vec();
        convert_into_selection(&plan, &src, &dst, elements, &mut destination, &space).unwrap();
        let mut expected = vec![9u8; 12];
        expected[3..5].copy_from_slice(&10i16.to_ne_bytes());
        expected[9..11].copy_from_slice(&(-20i16).to_ne_bytes());
        assert_eq!(destination, expected);

        let forced = plan.with_reuse(BufferReuse::Conversion);
        let elements: Vec<u8> = bytemuck::cast_slice(&[10i32, -20]).to_vec();
        assert!(matches!(
            convert_into_selection(&forced, &src, &dst, elements, &mut destination, &space),
            Err(ConversionError::NonContiguousReuse(BufferReuse::Conversion))
        ));
    }

    #[test]
    fn write_conversion_fresh_buffer() {
        let caller = [1.0f64, 2.5, -3.0, 4.75];
        let caller_bytes: &[u8] = bytemuck::cast_slice(&caller);
        assert!(needs_conversion(&DataType::Float64, &DataType::Float32));
        let plan = ConversionPlan::new_write(&DataType::Float64, &DataType::Float32, 4).unwrap();
        assert_eq!(plan.reuse(), BufferReuse::None);
        let outgoing =
            convert_to_new(&plan, &DataType::Float64, &DataType::Float32, caller_bytes).unwrap();
        assert_eq!(outgoing.len(), 16);
        let outgoing: Vec<f32> = bytemuck::pod_collect_to_vec(&outgoing);
        assert_eq!(outgoing, vec![1.0f32, 2.5, -3.0, 4.75]);
        assert_eq!(caller, [1.0f64, 2.5, -3.0, 4.75]);
        assert!(convert_to_new(&plan, &DataType::Float64, &DataType::Float32, &caller_bytes[..8]).is_err());
    }
}
