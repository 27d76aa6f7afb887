use num::{Bounded, Zero};

use crate::data_type::DataType;

use super::ConversionError;

/// A numeric value widened to the largest type of its kind.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NumericValue {
    /// A signed integer.
    Signed(i64),
    /// An unsigned integer.
    Unsigned(u64),
    /// A floating point number.
    Float(f64),
}

impl NumericValue {
    /// Read a native byte order numeric element of `data_type` from `bytes`.
    ///
    /// Returns [`None`] if `data_type` is not numeric or `bytes` does not match its size.
    #[must_use]
    pub fn read(data_type: &DataType, bytes: &[u8]) -> Option<Self> {
        if data_type.fixed_size() != Some(bytes.len()) {
            return None;
        }
        let value = match data_type {
            DataType::Int8 => Self::Signed(i64::from(bytemuck::pod_read_unaligned::<i8>(bytes))),
            DataType::Int16 => Self::Signed(i64::from(bytemuck::pod_read_unaligned::<i16>(bytes))),
            DataType::Int32 => Self::Signed(i64::from(bytemuck::pod_read_unaligned::<i32>(bytes))),
            DataType::Int64 => Self::Signed(bytemuck::pod_read_unaligned::<i64>(bytes)),
            DataType::UInt8 => Self::Unsigned(u64::from(bytes[0])),
            DataType::UInt16 => {
                Self::Unsigned(u64::from(bytemuck::pod_read_unaligned::<u16>(bytes)))
            }
            DataType::UInt32 => {
                Self::Unsigned(u64::from(bytemuck::pod_read_unaligned::<u32>(bytes)))
            }
            DataType::UInt64 => Self::Unsigned(bytemuck::pod_read_unaligned::<u64>(bytes)),
            DataType::Float32 => {
                Self::Float(f64::from(bytemuck::pod_read_unaligned::<f32>(bytes)))
            }
            DataType::Float64 => Self::Float(bytemuck::pod_read_unaligned::<f64>(bytes)),
            _ => return None,
        };
        Some(value)
    }

    /// Write the value as a native byte order numeric element of `data_type` into `bytes`.
    ///
    /// Values outside of the range of `data_type` saturate to its bounds, and NaN converts to zero for integer types.
    /// Returns [`None`] if `data_type` is not numeric or `bytes` does not match its size.
    pub fn write(self, data_type: &DataType, bytes: &mut [u8]) -> Option<()> {
        if data_type.fixed_size() != Some(bytes.len()) {
            return None;
        }
        match data_type {
            DataType::Int8 => bytes.copy_from_slice(&self.cast_saturating::<i8>().to_ne_bytes()),
            DataType::Int16 => bytes.copy_from_slice(&self.cast_saturating::<i16>().to_ne_bytes()),
            DataType::Int32 => bytes.copy_from_slice(&self.cast_saturating::<i32>().to_ne_bytes()),
            DataType::Int64 => bytes.copy_from_slice(&self.cast_saturating::<i64>().to_ne_bytes()),
            DataType::UInt8 => bytes.copy_from_slice(&self.cast_saturating::<u8>().to_ne_bytes()),
            DataType::UInt16 => bytes.copy_from_slice(&self.cast_saturating::<u16>().to_ne_bytes()),
            DataType::UInt32 => bytes.copy_from_slice(&self.cast_saturating::<u32>().to_ne_bytes()),
            DataType::UInt64 => bytes.copy_from_slice(&self.cast_saturating::<u64>().to_ne_bytes()),
            DataType::Float32 => bytes.copy_from_slice(&self.cast_saturating::<f32>().to_ne_bytes()),
            DataType::Float64 => bytes.copy_from_slice(&self.cast_saturating::<f64>().to_ne_bytes()),
            _ => return None,
        }
        Some(())
    }

    /// Cast the value to `T`, or return [`None`] if it is out of range of `T`.
    #[must_use]
    pub fn cast<T: num::NumCast>(self) -> Option<T> {
        match self {
            Self::Signed(value) => <T as num::NumCast>::from(value),
            Self::Unsigned(value) => <T as num::NumCast>::from(value),
            Self::Float(value) => <T as num::NumCast>::from(value),
        }
    }

    fn cast_saturating<T: num::NumCast + Bounded + Zero>(self) -> T {
        self.cast().unwrap_or_else(|| match self {
            Self::Float(value) if value.is_nan() => T::zero(),
            Self::Signed(value) if value < 0 => T::min_value(),
            Self::Float(value) if value < 0.0 => T::min_value(),
            _ => T::max_value(),
        })
    }
}

/// Check that elements of `src_type` can be converted to `dst_type`.
///
/// Numeric types convert to any numeric type, fixed strings to fixed strings, and compounds to compounds whose name-matched members are convertible.
pub(super) fn check_convertible(src_type: &DataType, dst_type: &DataType) -> Result<(), ConversionError> {
    let unsupported = || ConversionError::Unsupported(src_type.to_string(), dst_type.to_string());
    if src_type == dst_type {
        return Ok(());
    }
    match (src_type, dst_type) {
        (src, dst) if src.is_numeric() && dst.is_numeric() => Ok(()),
        (DataType::FixedString(_), DataType::FixedString(_)) => Ok(()),
        (DataType::Compound(src), DataType::Compound(dst)) => {
            for dst_member in dst.members() {
                if let Some(src_member) = src.member(dst_member.name()) {
                    check_convertible(src_member.data_type(), dst_member.data_type())
                        .map_err(|_| unsupported())?;
                }
            }
            Ok(())
        }
        _ => Err(unsupported()),
    }
}

/// Convert one element. `dst` holds the background value of the element on entry.
///
/// The types must have passed [`check_convertible`].
pub(super) fn convert_element(src_type: &DataType, dst_type: &DataType, src: &[u8], dst: &mut [u8]) {
    if src_type == dst_type {
        dst.copy_from_slice(src);
        return;
    }
    match (src_type, dst_type) {
        (DataType::FixedString(_), DataType::FixedString(_)) => {
            let length = src.len().min(dst.len());
            dst[..length].copy_from_slice(&src[..length]);
            dst[length..].fill(0);
        }
        (DataType::Compound(src_compound), DataType::Compound(dst_compound)) => {
            for dst_member in dst_compound.members() {
                let Some(src_member) = src_compound.member(dst_member.name()) else {
                    continue;
                };
                let src_range = src_member.offset()..src_member.offset() + src_member.size();
                let dst_range = dst_member.offset()..dst_member.offset() + dst_member.size();
                convert_element(
                    src_member.data_type(),
                    dst_member.data_type(),
                    &src[src_range],
                    &mut dst[dst_range],
                );
            }
        }
        _ => {
            if let Some(value) = NumericValue::read(src_type, src) {
                let written = value.write(dst_type, dst);
                debug_assert!(written.is_some());
            }
        }
    }
}

/// Convert `num_elements` packed elements in place in `buffer`, which must hold at least `max(src_size, dst_size) * num_elements` bytes.
///
/// Elements are visited front to back when the destination elements are no larger than the source elements, and back to front otherwise, so no source element is overwritten before it is converted.
pub(super) fn convert_in_place(
    src_type: &DataType,
    dst_type: &DataType,
    buffer: &mut [u8],
    num_elements: usize,
    background: Option<&[u8]>,
) {
    let src_size = src_type.fixed_size().unwrap_or_default();
    let dst_size = dst_type.fixed_size().unwrap_or_default();
    debug_assert!(buffer.len() >= src_size.max(dst_size) * num_elements);
    let mut src_element = vec![0u8; src_size];
    let mut dst_element = vec![0u8; dst_size];
    let mut convert = |index: usize| {
        src_element.copy_from_slice(&buffer[index * src_size..(index + 1) * src_size]);
        match background {
            Some(background) => dst_element
                .copy_from_slice(&background[index * dst_size..(index + 1) * dst_size]),
            None => dst_element.fill(0),
        }
        convert_element(src_type, dst_type, &src_element, &mut dst_element);
        buffer[index * dst_size..(index + 1) * dst_size].copy_from_slice(&dst_element);
    };
    if dst_size <= src_size {
        (0..num_elements).for_each(&mut convert);
    } else {
        (0..num_elements).rev().for_each(&mut convert);
    }
}
