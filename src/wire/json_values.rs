use serde_json::Value;

use crate::data_type::DataType;

use super::{WireCodecError, WireValue};

/// Decode a JSON value array into `num_elements` packed native elements of `data_type`.
///
/// `value` is a (possibly nested, one level per dimension) array of elements, or a single element for a scalar selection.
/// Elements are visited positionally in row-major order.
/// An array is a compound element, rather than an array of elements, if it has one item per compound member and each item is an element of its member type.
///
/// # Errors
/// Returns a [`WireCodecError`] if an element cannot be decoded or the number of elements does not match `num_elements`.
pub fn decode_json_values(
    value: &Value,
    data_type: &DataType,
    num_elements: u64,
) -> Result<Vec<u8>, WireCodecError> {
    let size = data_type
        .fixed_size()
        .ok_or_else(|| WireCodecError::UnsupportedDataType(data_type.to_string()))?;
    let mut elements = Vec::new();
    flatten(value, data_type, &mut elements);
    if elements.len() as u64 != num_elements {
        return Err(WireCodecError::ElementCountMismatch {
            got: elements.len() as u64,
            expected: num_elements,
        });
    }
    let mut bytes = vec![0u8; elements.len() * size];
    if size > 0 {
        for (element, element_bytes) in elements.iter().zip(bytes.chunks_exact_mut(size)) {
            WireValue::from_json(element, data_type)?.write(data_type, element_bytes)?;
        }
    }
    Ok(bytes)
}

fn flatten<'a>(value: &'a Value, data_type: &DataType, elements: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) if !WireValue::is_element(value, data_type) => {
            for item in items {
                flatten(item, data_type, elements);
            }
        }
        _ => elements.push(value),
    }
}

/// Encode `num_elements` packed native elements of `data_type` as a flat JSON array of elements.
///
/// # Errors
/// Returns a [`WireCodecError`] if `bytes` does not hold `num_elements` valid elements.
pub fn encode_json_values(
    bytes: &[u8],
    data_type: &DataType,
    num_elements: usize,
) -> Result<Value, WireCodecError> {
    let size = data_type
        .fixed_size()
        .ok_or_else(|| WireCodecError::UnsupportedDataType(data_type.to_string()))?;
    if bytes.len() != size * num_elements {
        return Err(super::IncompatibleBufferLengthError::new(bytes.len(), size * num_elements).into());
    }
    (0..num_elements)
        .map(|index| {
            WireValue::read(data_type, &bytes[index * size..(index + 1) * size])
                .map(|value| value.to_json())
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::data_type::CompoundType;

    #[test]
    fn decode_nested_numeric() {
        let value = json!([[1, 2, 3], [4, 5, 6]]);
        let bytes = decode_json_values(&value, &DataType::UInt16, 6).unwrap();
        let decoded: Vec<u16> = bytemuck::pod_collect_to_vec(&bytes);
        assert_eq!(decoded, vec![1, 2, 3, 4, 5, 6]);
        assert!(matches!(
            decode_json_values(&value, &DataType::UInt16, 5),
            Err(WireCodecError::ElementCountMismatch {
                got: 6,
                expected: 5
            })
        ));
        let scalar = decode_json_values(&json!(2.5), &DataType::Float32, 1).unwrap();
        assert_eq!(scalar, 2.5f32.to_ne_bytes());
    }

    #[test]
    fn decode_compound_elements() {
        let data_type = DataType::Compound(
            CompoundType::new(vec![
                ("x".to_string(), DataType::Int32),
                ("y".to_string(), DataType::Float64),
            ])
            .unwrap(),
        );
        // two compound elements in a 2x1 array, and one flat list of two elements
        for value in [json!([[[1, 0.5]], [[2, -1.5]]]), json!([[1, 0.5], [2, -1.5]])] {
            let bytes = decode_json_values(&value, &data_type, 2).unwrap();
            assert_eq!(bytes.len(), 24);
            assert_eq!(&bytes[..4], &1i32.to_ne_bytes());
            assert_eq!(&bytes[4..12], &0.5f64.to_ne_bytes());
            assert_eq!(&bytes[12..16], &2i32.to_ne_bytes());
            assert_eq!(&bytes[16..], &(-1.5f64).to_ne_bytes());
            assert_eq!(
                encode_json_values(&bytes, &data_type, 2).unwrap(),
                json!([[1, 0.5], [2, -1.5]])
            );
        }
    }

    #[test]
    fn decode_unsupported_kind() {
        assert!(matches!(
            decode_json_values(&json!([1, {"a": 1}]), &DataType::Int8, 2),
            Err(WireCodecError::UnsupportedElementKind { .. })
        ));
        assert!(matches!(
            decode_json_values(&json!(["a"]), &DataType::VariableString, 1),
            Err(WireCodecError::UnsupportedDataType(_))
        ));
    }
}
