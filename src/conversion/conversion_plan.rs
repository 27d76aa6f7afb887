use derive_more::Display;

use crate::data_type::DataType;

use super::{convert::check_convertible, ConversionError};

/// How an existing destination buffer is reused by a conversion.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum BufferReuse {
    /// The destination is not reused, fresh scratch buffers are allocated.
    #[display("none")]
    None,
    /// The destination is large enough to serve as the conversion buffer.
    #[display("conversion")]
    Conversion,
    /// The destination serves as the background buffer.
    #[display("background")]
    Background,
}

/// A type conversion plan for converting a number of elements between two data types.
///
/// The plan is derived from the data types and the number of elements, and decides
///  - whether a background buffer holding pre-existing destination values is required,
///  - whether that background buffer must be filled with the current destination values, and
///  - whether the destination buffer can be reused as the conversion or background buffer.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ConversionPlan {
    src_size: usize,
    dst_size: usize,
    num_elements: usize,
    reuse: BufferReuse,
    need_background: bool,
    fill_background: bool,
}

impl ConversionPlan {
    /// Plan a conversion of `num_elements` elements from `src_type` to `dst_type`.
    ///
    /// Set `reusable_destination` if the destination is a single contiguous buffer of `dst_size * num_elements` bytes that may be used as scratch space.
    /// It is reused as the conversion buffer if destination elements are at least as large as source elements, otherwise as the background buffer if one is needed.
    ///
    /// # Errors
    /// Returns a [`ConversionError`] if either type has a variable size or the types are not convertible.
    pub fn new(
        src_type: &DataType,
        dst_type: &DataType,
        num_elements: usize,
        reusable_destination: bool,
    ) -> Result<Self, ConversionError> {
        let src_size = src_type
            .fixed_size()
            .ok_or_else(|| ConversionError::VariableSize(src_type.to_string()))?;
        let dst_size = dst_type
            .fixed_size()
            .ok_or_else(|| ConversionError::VariableSize(dst_type.to_string()))?;
        check_convertible(src_type, dst_type)?;

        let (need_background, fill_background) = need_background(src_type, dst_type);
        let reuse = if !reusable_destination || num_elements == 0 {
            BufferReuse::None
        } else if dst_size >= src_size {
            BufferReuse::Conversion
        } else if need_background {
            BufferReuse::Background
        } else {
            BufferReuse::None
        };
        Ok(Self {
            src_size,
            dst_size,
            num_elements,
            reuse,
            need_background,
            fill_background,
        })
    }

    /// Plan a conversion of caller elements of `src_type` to outgoing wire elements of `dst_type`.
    ///
    /// The caller buffer is never reused on the write path.
    ///
    /// # Errors
    /// Returns [`ConversionError::PartialWrite`] if the conversion would leave destination members without a value.
    /// See also [`ConversionPlan::new`].
    pub fn new_write(
        src_type: &DataType,
        dst_type: &DataType,
        num_elements: usize,
    ) -> Result<Self, ConversionError> {
        let plan = Self::new(src_type, dst_type, num_elements, false)?;
        if plan.fill_background {
            Err(ConversionError::PartialWrite(
                src_type.to_string(),
                dst_type.to_string(),
            ))
        } else {
            Ok(plan)
        }
    }

    /// Return the source element size in bytes.
    #[must_use]
    pub fn src_size(&self) -> usize {
        self.src_size
    }

    /// Return the destination element size in bytes.
    #[must_use]
    pub fn dst_size(&self) -> usize {
        self.dst_size
    }

    /// Return the number of elements.
    #[must_use]
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// Return the buffer reuse decision.
    #[must_use]
    pub fn reuse(&self) -> BufferReuse {
        self.reuse
    }

    /// Returns true if a background buffer is required.
    #[must_use]
    pub fn need_background(&self) -> bool {
        self.need_background
    }

    /// Returns true if the background buffer must hold the current destination values.
    #[must_use]
    pub fn fill_background(&self) -> bool {
        self.fill_background
    }

    /// Return the size in bytes of a conversion buffer: `max(src_size, dst_size) * num_elements`.
    #[must_use]
    pub fn conversion_buffer_size(&self) -> usize {
        self.src_size.max(self.dst_size) * self.num_elements
    }

    /// Return the size in bytes of the converted elements: `dst_size * num_elements`.
    #[must_use]
    pub fn dst_buffer_size(&self) -> usize {
        self.dst_size * self.num_elements
    }

    #[cfg(test)]
    pub(super) fn with_reuse(mut self, reuse: BufferReuse) -> Self {
        self.reuse = reuse;
        self
    }
}

/// Determine if a conversion from `src_type` to `dst_type` needs a background buffer, and if so whether it must be filled with the current destination values.
///
/// Compound conversions always need a background buffer.
/// It must be filled if a destination member has no source member of the same name, or the destination members do not cover the whole compound.
fn need_background(src_type: &DataType, dst_type: &DataType) -> (bool, bool) {
    let DataType::Compound(dst) = dst_type else {
        return (false, false);
    };
    let DataType::Compound(src) = src_type else {
        return (true, true);
    };
    for dst_member in dst.members() {
        let Some(src_member) = src.member(dst_member.name()) else {
            return (true, true);
        };
        if need_background(src_member.data_type(), dst_member.data_type()).1 {
            return (true, true);
        }
    }
    (true, dst.size_used() != dst.size())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::{CompoundMember, CompoundType};

    #[test]
    fn plan_numeric() {
        let plan = ConversionPlan::new(&DataType::Float32, &DataType::Float64, 4, true).unwrap();
        assert_eq!(plan.reuse(), BufferReuse::Conversion);
        assert!(!plan.need_background());
        assert_eq!(plan.conversion_buffer_size(), 32);

        let plan = ConversionPlan::new(&DataType::Float64, &DataType::Float32, 4, true).unwrap();
        assert_eq!(plan.reuse(), BufferReuse::None);

        let plan = ConversionPlan::new_write(&DataType::Float64, &DataType::Float32, 4).unwrap();
        assert_eq!(plan.reuse(), BufferReuse::None);
        assert_eq!(plan.dst_buffer_size(), 16);
    }

    #[test]
    fn plan_compound() {
        let wire = DataType::Compound(
            CompoundType::new(vec![
                ("a".to_string(), DataType::Int32),
                ("b".to_string(), DataType::Float64),
                ("c".to_string(), DataType::Int16),
            ])
            .unwrap(),
        );
        let subset = DataType::Compound(
            CompoundType::new(vec![("b".to_string(), DataType::Float32)]).unwrap(),
        );
        let plan = ConversionPlan::new(&wire, &subset, 3, true).unwrap();
        assert_eq!(plan.reuse(), BufferReuse::Background);
        assert!(plan.need_background());
        assert!(!plan.fill_background());

        let superset = DataType::Compound(
            CompoundType::new(vec![
                ("b".to_string(), DataType::Float64),
                ("d".to_string(), DataType::UInt8),
            ])
            .unwrap(),
        );
        let plan = ConversionPlan::new(&subset, &superset, 3, true).unwrap();
        assert_eq!(plan.reuse(), BufferReuse::Conversion);
        assert!(plan.fill_background());
        assert!(matches!(
            ConversionPlan::new_write(&subset, &superset, 3),
            Err(ConversionError::PartialWrite(..))
        ));

        let padded = DataType::Compound(
            CompoundType::new_with_layout(vec![CompoundMember::new("b", 8, DataType::Float64)], 16)
                .unwrap(),
        );
        let plan = ConversionPlan::new(&subset, &padded, 3, false).unwrap();
        assert_eq!(plan.reuse(), BufferReuse::None);
        assert!(plan.fill_background());
    }

    #[test]
    fn plan_unsupported() {
        assert!(matches!(
            ConversionPlan::new(&DataType::VariableString, &DataType::FixedString(4), 1, false),
            Err(ConversionError::VariableSize(_))
        ));
        assert!(matches!(
            ConversionPlan::new(&DataType::Int32, &DataType::FixedString(4), 1, false),
            Err(ConversionError::Unsupported(..))
        ));
    }
}
