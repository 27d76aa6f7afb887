//! Element data types.
//!
//! A [`DataType`] describes the in-memory layout of one array element, either as the caller holds it or as the array store holds it on the wire.
//! Wire data types are usually parsed from the JSON type descriptor supplied by the metadata layer, see [`DataTypeMetadata`].

mod compound;
mod data_type_metadata;
mod endianness;

pub use compound::{CompoundMember, CompoundType};
pub use data_type_metadata::{
    parse_shape_descriptor, parse_type_descriptor, CompoundFieldMetadata,
    DataTypeDescriptionMetadata, DataTypeMetadata, DataTypeMetadataError, ShapeMetadata,
    StringLengthMetadata,
};
pub use endianness::{reverse_endianness, Endianness, NATIVE_ENDIAN};

use derive_more::Display;
use itertools::Itertools;
use thiserror::Error;

/// The size in bytes of an object reference element.
pub const OBJECT_REFERENCE_SIZE: usize = 48;

/// A data type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[rustfmt::skip]
pub enum DataType {
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    UInt64,
    /// `float32` IEEE 754 single-precision floating point.
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    Float64,
    /// A structure of named members at fixed byte offsets.
    Compound(CompoundType),
    /// A NUL-padded string of fixed size in bytes.
    FixedString(usize),
    /// A string of variable length.
    VariableString,
    /// A sequence of variable length of a base type.
    VariableLength(Box<DataType>),
    /// A reference to a group, datatype or dataset, stored as a NUL-padded `<collection>/<id>` string of [`OBJECT_REFERENCE_SIZE`] bytes.
    ObjectReference,
}

/// The class of a [`DataType`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum DataTypeClass {
    /// An integer.
    #[display("integer")]
    Integer,
    /// A floating point number.
    #[display("float")]
    Float,
    /// A compound.
    #[display("compound")]
    Compound,
    /// A string.
    #[display("string")]
    String,
    /// A variable length sequence.
    #[display("variable length")]
    VariableLength,
    /// An object reference.
    #[display("reference")]
    Reference,
}

/// The size of a data type.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DataTypeSize {
    /// Fixed size (in bytes).
    Fixed(usize),
    /// Variable sized.
    Variable,
}

/// A data type error.
#[derive(Clone, Debug, Error)]
pub enum DataTypeError {
    /// A compound type without members.
    #[error("compound types must have at least one member")]
    EmptyCompound,
    /// A compound type with two members of the same name.
    #[error("compound member name {0} is not unique")]
    DuplicateMember(String),
    /// A compound member of variable size.
    #[error("compound member {0} has a variable size data type")]
    VariableSizeMember(String),
    /// A compound member extending beyond the compound.
    #[error("compound member {name} at offset {offset} does not fit in a compound of size {size}")]
    MemberOutOfBounds {
        /// The member name.
        name: String,
        /// The member offset.
        offset: usize,
        /// The compound size.
        size: usize,
    },
    /// Two compound members occupying the same bytes.
    #[error("compound members {0} and {1} overlap")]
    OverlappingMembers(String, String),
}

impl DataType {
    /// Returns the class of the data type.
    #[must_use]
    pub fn class(&self) -> DataTypeClass {
        match self {
            Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Int64
            | Self::UInt8
            | Self::UInt16
            | Self::UInt32
            | Self::UInt64 => DataTypeClass::Integer,
            Self::Float32 | Self::Float64 => DataTypeClass::Float,
            Self::Compound(_) => DataTypeClass::Compound,
            Self::FixedString(_) | Self::VariableString => DataTypeClass::String,
            Self::VariableLength(_) => DataTypeClass::VariableLength,
            Self::ObjectReference => DataTypeClass::Reference,
        }
    }

    /// Returns the size of the data type.
    #[must_use]
    pub fn size(&self) -> DataTypeSize {
        match self {
            Self::Int8 | Self::UInt8 => DataTypeSize::Fixed(1),
            Self::Int16 | Self::UInt16 => DataTypeSize::Fixed(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => DataTypeSize::Fixed(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => DataTypeSize::Fixed(8),
            Self::Compound(compound) => DataTypeSize::Fixed(compound.size()),
            Self::FixedString(size) => DataTypeSize::Fixed(*size),
            Self::ObjectReference => DataTypeSize::Fixed(OBJECT_REFERENCE_SIZE),
            Self::VariableString | Self::VariableLength(_) => DataTypeSize::Variable,
        }
    }

    /// Returns the size in bytes of a fixed-size data type, or [`None`] if it has a variable size.
    #[must_use]
    pub fn fixed_size(&self) -> Option<usize> {
        match self.size() {
            DataTypeSize::Fixed(size) => Some(size),
            DataTypeSize::Variable => None,
        }
    }

    /// Returns true if the data type is a variable length string or sequence.
    ///
    /// Compound members are always fixed-size, so a compound is never variable length.
    #[must_use]
    pub fn is_variable_length(&self) -> bool {
        self.size() == DataTypeSize::Variable
    }

    /// Returns true if the data type is an integer or float.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self.class(), DataTypeClass::Integer | DataTypeClass::Float)
    }

    /// Returns the name of the data type.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Int8 => "int8".to_string(),
            Self::Int16 => "int16".to_string(),
            Self::Int32 => "int32".to_string(),
            Self::Int64 => "int64".to_string(),
            Self::UInt8 => "uint8".to_string(),
            Self::UInt16 => "uint16".to_string(),
            Self::UInt32 => "uint32".to_string(),
            Self::UInt64 => "uint64".to_string(),
            Self::Float32 => "float32".to_string(),
            Self::Float64 => "float64".to_string(),
            Self::Compound(compound) => format!(
                "compound{{{}}}",
                compound
                    .members()
                    .iter()
                    .map(|member| format!("{}@{}: {}", member.name(), member.offset(), member.data_type()))
                    .join(", ")
            ),
            Self::FixedString(size) => format!("string{size}"),
            Self::VariableString => "vlen_string".to_string(),
            Self::VariableLength(base) => format!("vlen<{base}>"),
            Self::ObjectReference => "reference".to_string(),
        }
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<CompoundType> for DataType {
    fn from(compound: CompoundType) -> Self {
        Self::Compound(compound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_sizes() {
        assert_eq!(DataType::Int16.size(), DataTypeSize::Fixed(2));
        assert_eq!(DataType::Float64.fixed_size(), Some(8));
        assert_eq!(DataType::ObjectReference.fixed_size(), Some(48));
        assert_eq!(DataType::VariableString.fixed_size(), None);
        assert_eq!(DataType::FixedString(7).fixed_size(), Some(7));
        assert_eq!(DataType::UInt8.class(), DataTypeClass::Integer);
        assert_eq!(DataType::Float32.class().to_string(), "float");
    }

    #[test]
    fn data_type_variable_length() {
        let compound = CompoundType::new(vec![
            ("a".to_string(), DataType::Int32),
            ("b".to_string(), DataType::Float64),
        ])
        .unwrap();
        let data_type = DataType::Compound(compound);
        assert!(!data_type.is_variable_length());
        assert_eq!(data_type.fixed_size(), Some(12));
        assert_eq!(data_type.to_string(), "compound{a@0: int32, b@4: float64}");
        assert!(DataType::VariableLength(Box::new(DataType::Int8)).is_variable_length());
    }
}
