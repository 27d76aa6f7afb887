use serde_json::{json, Value};

use crate::{conversion::NumericValue, data_type::DataType};

use super::{object_reference::write_slot, ObjectReference, WireCodecError};

/// A typed value tree mirroring a [`DataType`], used while decoding and encoding JSON elements.
#[derive(Clone, Debug, PartialEq)]
pub enum WireValue {
    /// An integer or float.
    Numeric(NumericValue),
    /// A fixed-size string.
    String(String),
    /// An object reference, [`None`] if null.
    Reference(Option<ObjectReference>),
    /// A compound with ordered named members.
    Compound(Vec<(String, WireValue)>),
}

impl WireValue {
    /// Decode a JSON element of `data_type`.
    ///
    /// Numeric types accept JSON numbers, and float types also accept `"NaN"`, `"Infinity"` and `"-Infinity"`.
    /// Compound elements are JSON arrays with one item per member in declaration order.
    ///
    /// # Errors
    /// Returns [`WireCodecError::UnsupportedElementKind`] if `value` is of a JSON kind that does not match `data_type`, or [`WireCodecError::UnsupportedDataType`] for variable length data types.
    pub fn from_json(value: &Value, data_type: &DataType) -> Result<Self, WireCodecError> {
        let unsupported = || WireCodecError::UnsupportedElementKind {
            value: value.to_string(),
            data_type: data_type.to_string(),
        };
        match (data_type, value) {
            (DataType::VariableString | DataType::VariableLength(_), _) => {
                Err(WireCodecError::UnsupportedDataType(data_type.to_string()))
            }
            (DataType::Compound(compound), Value::Array(items)) => {
                if items.len() != compound.members().len() {
                    return Err(unsupported());
                }
                compound
                    .members()
                    .iter()
                    .zip(items)
                    .map(|(member, item)| {
                        Ok((
                            member.name().to_string(),
                            Self::from_json(item, member.data_type())?,
                        ))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::Compound)
            }
            (DataType::FixedString(_), Value::String(string)) => Ok(Self::String(string.clone())),
            (DataType::ObjectReference, Value::String(string)) => {
                if string.is_empty() {
                    Ok(Self::Reference(None))
                } else {
                    Ok(Self::Reference(Some(string.parse()?)))
                }
            }
            (DataType::ObjectReference, Value::Null) => Ok(Self::Reference(None)),
            (data_type, Value::Number(number)) if data_type.is_numeric() => {
                let value = if let Some(value) = number.as_u64() {
                    NumericValue::Unsigned(value)
                } else if let Some(value) = number.as_i64() {
                    NumericValue::Signed(value)
                } else {
                    NumericValue::Float(number.as_f64().ok_or_else(unsupported)?)
                };
                Ok(Self::Numeric(value))
            }
            (DataType::Float32 | DataType::Float64, Value::String(string)) => {
                match string.as_str() {
                    "NaN" => Ok(Self::Numeric(NumericValue::Float(f64::NAN))),
                    "Infinity" => Ok(Self::Numeric(NumericValue::Float(f64::INFINITY))),
                    "-Infinity" => Ok(Self::Numeric(NumericValue::Float(f64::NEG_INFINITY))),
                    _ => Err(unsupported()),
                }
            }
            _ => Err(unsupported()),
        }
    }

    /// Returns true if `value` is a single JSON element of `data_type`, rather than an array of elements.
    pub(super) fn is_element(value: &Value, data_type: &DataType) -> bool {
        match (data_type, value) {
            (DataType::Compound(compound), Value::Array(items)) => {
                items.len() == compound.members().len()
                    && compound
                        .members()
                        .iter()
                        .zip(items)
                        .all(|(member, item)| Self::is_element(item, member.data_type()))
            }
            (DataType::Compound(_), _) => false,
            (_, value) => !value.is_array(),
        }
    }

    /// Encode the value as a JSON element.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Numeric(NumericValue::Signed(value)) => json!(value),
            Self::Numeric(NumericValue::Unsigned(value)) => json!(value),
            Self::Numeric(NumericValue::Float(value)) => {
                if value.is_nan() {
                    json!("NaN")
                } else if value.is_infinite() {
                    json!(if *value > 0.0 { "Infinity" } else { "-Infinity" })
                } else {
                    json!(value)
                }
            }
            Self::String(string) => json!(string),
            Self::Reference(reference) => json!(reference
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default()),
            Self::Compound(members) => {
                Value::Array(members.iter().map(|(_, member)| member.to_json()).collect())
            }
        }
    }

    /// Read a native element of `data_type` from `bytes`.
    ///
    /// # Errors
    /// Returns a [`WireCodecError`] if `data_type` has a variable size, or `bytes` does not hold a valid element.
    pub fn read(data_type: &DataType, bytes: &[u8]) -> Result<Self, WireCodecError> {
        match data_type {
            DataType::Compound(compound) => compound
                .members()
                .iter()
                .map(|member| {
                    let member_bytes = bytes
                        .get(member.offset()..member.offset() + member.size())
                        .ok_or_else(|| WireCodecError::UnsupportedDataType(data_type.to_string()))?;
                    Ok((
                        member.name().to_string(),
                        Self::read(member.data_type(), member_bytes)?,
                    ))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Compound),
            DataType::FixedString(_) => {
                let length = bytes.iter().position(|&byte| byte == 0).unwrap_or(bytes.len());
                Ok(Self::String(
                    String::from_utf8_lossy(&bytes[..length]).into_owned(),
                ))
            }
            DataType::ObjectReference => Ok(Self::Reference(ObjectReference::from_slot(bytes)?)),
            _ => NumericValue::read(data_type, bytes)
                .map(Self::Numeric)
                .ok_or_else(|| WireCodecError::UnsupportedDataType(data_type.to_string())),
        }
    }

    /// Write the value as a native element of `data_type` into `bytes`.
    ///
    /// Numeric values saturate to the range of `data_type`, and strings are truncated or NUL-padded to its size.
    ///
    /// # Errors
    /// Returns a [`WireCodecError`] if the value does not match `data_type` or `bytes` is not the size of `data_type`.
    pub fn write(&self, data_type: &DataType, bytes: &mut [u8]) -> Result<(), WireCodecError> {
        let mismatch = || WireCodecError::UnsupportedElementKind {
            value: self.to_json().to_string(),
            data_type: data_type.to_string(),
        };
        if data_type.fixed_size() != Some(bytes.len()) {
            return Err(WireCodecError::UnsupportedDataType(data_type.to_string()));
        }
        match (data_type, self) {
            (DataType::Compound(compound), Self::Compound(members)) => {
                if members.len() != compound.members().len() {
                    return Err(mismatch());
                }
                for (member, (_, value)) in compound.members().iter().zip(members) {
                    value.write(
                        member.data_type(),
                        &mut bytes[member.offset()..member.offset() + member.size()],
                    )?;
                }
                Ok(())
            }
            (DataType::FixedString(size), Self::String(string)) => {
                let length = string.len().min(*size);
                bytes[..length].copy_from_slice(&string.as_bytes()[..length]);
                bytes[length..].fill(0);
                Ok(())
            }
            (DataType::ObjectReference, Self::Reference(reference)) => {
                write_slot(reference.as_ref(), bytes);
                Ok(())
            }
            (data_type, Self::Numeric(value)) => value.write(data_type, bytes).ok_or_else(mismatch),
            _ => Err(mismatch()),
        }
    }
}
