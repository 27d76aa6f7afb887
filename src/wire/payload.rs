use base64::{prelude::BASE64_STANDARD, Engine};
use serde_json::Value;

use crate::{
    data_type::{reverse_endianness, DataType, Endianness},
    negotiation::{contains_reference, TransferMode},
    selection::{encode_json_body, Selection},
};

use super::{decode_json_values, encode_json_values, IncompatibleBufferLengthError, WireCodecError};

/// The body of a request.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// Raw packed elements.
    Binary(Vec<u8>),
    /// A JSON document.
    Json(Value),
}

impl RequestBody {
    /// Returns true if the body has no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Binary(bytes) => bytes.is_empty(),
            Self::Json(_) => false,
        }
    }

    /// Return the content type of the body, if it has one.
    #[must_use]
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Empty => None,
            Self::Binary(_) => Some(TransferMode::Binary.content_type()),
            Self::Json(_) => Some(TransferMode::Json.content_type()),
        }
    }

    /// Convert the body into bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Empty => Vec::new(),
            Self::Binary(bytes) => bytes,
            Self::Json(value) => value.to_string().into_bytes(),
        }
    }
}

/// Decode a binary response body into `num_elements` packed native elements of `wire_type`.
///
/// The body is swapped to native byte order if the wire `endianness` is not native.
///
/// # Errors
/// Returns [`WireCodecError::BufferLength`] if the body length is not `num_elements` times the size of `wire_type`.
pub fn decode_binary_payload(
    mut body: Vec<u8>,
    wire_type: &DataType,
    endianness: Endianness,
    num_elements: usize,
) -> Result<Vec<u8>, WireCodecError> {
    let size = wire_type
        .fixed_size()
        .ok_or_else(|| WireCodecError::UnsupportedDataType(wire_type.to_string()))?;
    if body.len() != size * num_elements {
        return Err(IncompatibleBufferLengthError::new(body.len(), size * num_elements).into());
    }
    if !endianness.is_native() {
        reverse_endianness(&mut body, wire_type);
    }
    Ok(body)
}

/// Decode a JSON response body `{"value": [...]}` into `num_elements` packed native elements of `wire_type`.
///
/// # Errors
/// Returns a [`WireCodecError`] if the body is malformed or its values cannot be decoded, see [`decode_json_values`].
pub fn decode_json_payload(
    body: &[u8],
    wire_type: &DataType,
    num_elements: usize,
) -> Result<Vec<u8>, WireCodecError> {
    let document: Value = serde_json::from_slice(body)?;
    let value = document
        .get("value")
        .ok_or_else(|| WireCodecError::MalformedJson("response has no value field".to_string()))?;
    decode_json_values(value, wire_type, num_elements as u64)
}

/// Encode `num_elements` packed native elements of `wire_type` as the body of a write request.
///
/// - Binary mode: the raw elements in the wire `endianness`.
/// - JSON mode: the JSON body fields of `selection` and either the base64 encoded raw elements (`value_base64`) or, if `base64` is false or the type holds object references, a JSON value array (`value`).
///
/// An empty write produces [`RequestBody::Empty`].
///
/// # Errors
/// Returns a [`WireCodecError`] if the selection cannot be encoded or `elements` does not hold `num_elements` elements.
pub fn encode_write_body(
    mode: TransferMode,
    selection: &Selection,
    wire_type: &DataType,
    endianness: Endianness,
    elements: &[u8],
    num_elements: usize,
    base64: bool,
) -> Result<RequestBody, WireCodecError> {
    let size = wire_type
        .fixed_size()
        .ok_or_else(|| WireCodecError::UnsupportedDataType(wire_type.to_string()))?;
    if elements.len() != size * num_elements {
        return Err(IncompatibleBufferLengthError::new(elements.len(), size * num_elements).into());
    }
    if num_elements == 0 {
        return Ok(RequestBody::Empty);
    }
    let wire_bytes = || {
        let mut bytes = elements.to_vec();
        if !endianness.is_native() {
            reverse_endianness(&mut bytes, wire_type);
        }
        bytes
    };
    match mode {
        TransferMode::Binary => Ok(RequestBody::Binary(wire_bytes())),
        TransferMode::Json => {
            let mut fields = encode_json_body(selection)?;
            if base64 && !contains_reference(wire_type) {
                fields.insert(
                    "value_base64".to_string(),
                    Value::String(BASE64_STANDARD.encode(wire_bytes())),
                );
            } else {
                fields.insert(
                    "value".to_string(),
                    encode_json_values(elements, wire_type, num_elements)?,
                );
            }
            Ok(RequestBody::Json(Value::Object(fields)))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::selection::PointSelection;

    #[test]
    fn binary_payload_endianness() {
        let body = vec![0x00, 0x01, 0x00, 0x02];
        let decoded =
            decode_binary_payload(body.clone(), &DataType::UInt16, Endianness::Big, 2).unwrap();
        let decoded: Vec<u16> = bytemuck::pod_collect_to_vec(&decoded);
        assert_eq!(decoded, vec![1, 2]);
        assert!(matches!(
            decode_binary_payload(body, &DataType::UInt16, Endianness::Big, 3),
            Err(WireCodecError::BufferLength(_))
        ));
    }

    #[test]
    fn json_payload() {
        let body = br#"{"hrefs": [], "value": [[1, 2], [3, 4]]}"#;
        let decoded = decode_json_payload(body, &DataType::Int64, 4).unwrap();
        let decoded: Vec<i64> = bytemuck::pod_collect_to_vec(&decoded);
        assert_eq!(decoded, vec![1, 2, 3, 4]);
        assert!(matches!(
            decode_json_payload(b"{\"values\": []}", &DataType::Int64, 0),
            Err(WireCodecError::MalformedJson(_))
        ));
        assert!(matches!(
            decode_json_payload(b"[1,", &DataType::Int64, 1),
            Err(WireCodecError::MalformedJson(_))
        ));
    }

    #[test]
    fn write_body_points() {
        let selection: Selection = PointSelection::new(1, vec![vec![3], vec![7]]).unwrap().into();
        let elements: Vec<u8> = bytemuck::cast_slice(&[1u16, 2u16]).to_vec();
        let body = encode_write_body(
            TransferMode::Json,
            &selection,
            &DataType::UInt16,
            Endianness::Little,
            &elements,
            2,
            true,
        )
        .unwrap();
        let little: Vec<u8> = [1u16, 2u16].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(
            body,
            RequestBody::Json(json!({
                "points": [3, 7],
                "value_base64": BASE64_STANDARD.encode(little),
            }))
        );
        let body = encode_write_body(
            TransferMode::Json,
            &selection,
            &DataType::UInt16,
            Endianness::Little,
            &elements,
            2,
            false,
        )
        .unwrap();
        assert_eq!(body, RequestBody::Json(json!({"points": [3, 7], "value": [1, 2]})));
        assert_eq!(body.content_type(), Some("application/json"));
    }

    #[test]
    fn write_body_empty() {
        let body = encode_write_body(
            TransferMode::Binary,
            &Selection::None,
            &DataType::Float32,
            Endianness::Little,
            &[],
            0,
            true,
        )
        .unwrap();
        assert!(body.is_empty());
        assert_eq!(body.content_type(), None);
    }
}
