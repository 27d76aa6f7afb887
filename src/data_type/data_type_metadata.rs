use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{CompoundType, DataType, DataTypeError, Endianness};
use crate::selection::ArrayShape;

/// The JSON type descriptor of an array, as supplied by the metadata layer.
///
/// Either the name of a predefined type (e.g. `"H5T_STD_I32LE"`) or a described type with a `class`.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataTypeMetadata {
    /// A predefined type name.
    Predefined(String),
    /// A described type.
    Described(DataTypeDescriptionMetadata),
}

/// A described JSON type descriptor.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum DataTypeDescriptionMetadata {
    /// An integer with a predefined base type.
    #[serde(rename = "H5T_INTEGER")]
    Integer {
        /// The predefined base type name.
        base: String,
    },
    /// A float with a predefined base type.
    #[serde(rename = "H5T_FLOAT")]
    Float {
        /// The predefined base type name.
        base: String,
    },
    /// A compound of ordered fields.
    #[serde(rename = "H5T_COMPOUND")]
    Compound {
        /// The fields in declaration order.
        fields: Vec<CompoundFieldMetadata>,
    },
    /// A fixed or variable length string.
    #[serde(rename = "H5T_STRING")]
    String {
        /// The string length.
        length: StringLengthMetadata,
    },
    /// A variable length sequence.
    #[serde(rename = "H5T_VLEN")]
    VariableLength {
        /// The sequence base type.
        base: Box<DataTypeMetadata>,
    },
    /// An object reference.
    #[serde(rename = "H5T_REFERENCE")]
    Reference {
        /// The reference base type name, `"H5T_STD_REF_OBJ"`.
        base: String,
    },
}

/// A field of a compound JSON type descriptor.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct CompoundFieldMetadata {
    /// The field name.
    pub name: String,
    /// The field type.
    #[serde(rename = "type")]
    pub data_type: DataTypeMetadata,
}

/// The length of a string JSON type descriptor.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringLengthMetadata {
    /// A fixed length in bytes.
    Fixed(usize),
    /// `"H5T_VARIABLE"`.
    Variable(String),
}

/// The JSON shape descriptor of an array.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum ShapeMetadata {
    /// A simple N-dimensional extent.
    #[serde(rename = "H5S_SIMPLE")]
    Simple {
        /// The extent of each dimension.
        dims: Vec<u64>,
    },
    /// A single element.
    #[serde(rename = "H5S_SCALAR")]
    Scalar,
    /// No elements.
    #[serde(rename = "H5S_NULL")]
    Null,
}

impl ShapeMetadata {
    /// Return the array shape.
    ///
    /// A scalar shape is zero-dimensional, and a null shape is a single dimension of extent zero.
    #[must_use]
    pub fn shape(&self) -> ArrayShape {
        match self {
            Self::Simple { dims } => dims.clone(),
            Self::Scalar => vec![],
            Self::Null => vec![0],
        }
    }
}

/// A data type metadata error.
#[derive(Debug, Error)]
pub enum DataTypeMetadataError {
    /// A descriptor that does not match the descriptor grammar.
    #[error("invalid descriptor {0}: {1}")]
    InvalidDescriptor(String, String),
    /// An unknown predefined type name.
    #[error("unknown predefined type {0}")]
    UnknownPredefinedType(String),
    /// A base type of the wrong class.
    #[error("base type {base} is not valid for class {class}")]
    InvalidBase {
        /// The class.
        class: &'static str,
        /// The base type name.
        base: String,
    },
    /// An invalid string length.
    #[error("invalid string length {0}")]
    InvalidStringLength(String),
    /// Compound members of differing byte order.
    #[error("compound members have differing byte order")]
    MixedEndianness,
    /// An invalid data type.
    #[error(transparent)]
    DataType(#[from] DataTypeError),
}

/// Parse a JSON type descriptor into a [`DataType`] and the byte order of its numeric leaves.
///
/// Types without numeric leaves (strings, references) are reported as little endian.
///
/// # Errors
/// Returns a [`DataTypeMetadataError`] if the descriptor is invalid or describes an unsupported type.
pub fn parse_type_descriptor(
    descriptor: &Value,
) -> Result<(DataType, Endianness), DataTypeMetadataError> {
    let metadata = DataTypeMetadata::deserialize(descriptor).map_err(|err| {
        DataTypeMetadataError::InvalidDescriptor(descriptor.to_string(), err.to_string())
    })?;
    let (data_type, endianness) = metadata.to_data_type()?;
    Ok((data_type, endianness.unwrap_or_default()))
}

/// Parse a JSON shape descriptor into an array shape.
///
/// # Errors
/// Returns [`DataTypeMetadataError::InvalidDescriptor`] if the descriptor is invalid.
pub fn parse_shape_descriptor(descriptor: &Value) -> Result<ArrayShape, DataTypeMetadataError> {
    let metadata = ShapeMetadata::deserialize(descriptor).map_err(|err| {
        DataTypeMetadataError::InvalidDescriptor(descriptor.to_string(), err.to_string())
    })?;
    Ok(metadata.shape())
}

impl DataTypeMetadata {
    /// Convert the descriptor to a [`DataType`] and the byte order of its numeric leaves, if it has any.
    ///
    /// # Errors
    /// Returns a [`DataTypeMetadataError`] if the descriptor describes an unsupported type.
    pub fn to_data_type(&self) -> Result<(DataType, Option<Endianness>), DataTypeMetadataError> {
        match self {
            Self::Predefined(name) => parse_predefined(name),
            Self::Described(DataTypeDescriptionMetadata::Integer { base }) => {
                parse_predefined_of_class(base, "H5T_INTEGER", |data_type| {
                    data_type.is_numeric() && !matches!(data_type, DataType::Float32 | DataType::Float64)
                })
            }
            Self::Described(DataTypeDescriptionMetadata::Float { base }) => {
                parse_predefined_of_class(base, "H5T_FLOAT", |data_type| {
                    matches!(data_type, DataType::Float32 | DataType::Float64)
                })
            }
            Self::Described(DataTypeDescriptionMetadata::Reference { base }) => {
                parse_predefined_of_class(base, "H5T_REFERENCE", |data_type| {
                    data_type == &DataType::ObjectReference
                })
            }
            Self::Described(DataTypeDescriptionMetadata::String { length }) => match length {
                StringLengthMetadata::Fixed(length) => Ok((DataType::FixedString(*length), None)),
                StringLengthMetadata::Variable(length) if length == "H5T_VARIABLE" => {
                    Ok((DataType::VariableString, None))
                }
                StringLengthMetadata::Variable(length) => {
                    Err(DataTypeMetadataError::InvalidStringLength(length.clone()))
                }
            },
            Self::Described(DataTypeDescriptionMetadata::VariableLength { base }) => {
                let (base, endianness) = base.to_data_type()?;
                Ok((DataType::VariableLength(Box::new(base)), endianness))
            }
            Self::Described(DataTypeDescriptionMetadata::Compound { fields }) => {
                let mut endianness = None;
                let mut members = Vec::with_capacity(fields.len());
                for field in fields {
                    let (data_type, field_endianness) = field.data_type.to_data_type()?;
                    match (endianness, field_endianness) {
                        (Some(a), Some(b)) if a != b => {
                            return Err(DataTypeMetadataError::MixedEndianness)
                        }
                        (None, Some(b)) => endianness = Some(b),
                        _ => {}
                    }
                    members.push((field.name.clone(), data_type));
                }
                Ok((DataType::Compound(CompoundType::new(members)?), endianness))
            }
        }
    }
}

fn parse_predefined_of_class(
    base: &str,
    class: &'static str,
    valid: impl Fn(&DataType) -> bool,
) -> Result<(DataType, Option<Endianness>), DataTypeMetadataError> {
    let (data_type, endianness) = parse_predefined(base)?;
    if valid(&data_type) {
        Ok((data_type, endianness))
    } else {
        Err(DataTypeMetadataError::InvalidBase {
            class,
            base: base.to_string(),
        })
    }
}

fn parse_predefined(name: &str) -> Result<(DataType, Option<Endianness>), DataTypeMetadataError> {
    if name == "H5T_STD_REF_OBJ" {
        return Ok((DataType::ObjectReference, None));
    }
    let unknown = || DataTypeMetadataError::UnknownPredefinedType(name.to_string());
    let (body, endianness) = if let Some(body) = name.strip_suffix("LE") {
        (body, Endianness::Little)
    } else if let Some(body) = name.strip_suffix("BE") {
        (body, Endianness::Big)
    } else {
        return Err(unknown());
    };
    let data_type = match body {
        "H5T_STD_I8" => DataType::Int8,
        "H5T_STD_I16" => DataType::Int16,
        "H5T_STD_I32" => DataType::Int32,
        "H5T_STD_I64" => DataType::Int64,
        "H5T_STD_U8" => DataType::UInt8,
        "H5T_STD_U16" => DataType::UInt16,
        "H5T_STD_U32" => DataType::UInt32,
        "H5T_STD_U64" => DataType::UInt64,
        "H5T_IEEE_F32" => DataType::Float32,
        "H5T_IEEE_F64" => DataType::Float64,
        _ => return Err(unknown()),
    };
    Ok((data_type, Some(endianness)))
}
