use derive_more::Display;

use super::DataType;

/// The byte order of each numeric element, either `big` or `little`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, Default)]
pub enum Endianness {
    /// Little endian.
    #[default]
    #[display("little")]
    Little,

    /// Big endian.
    #[display("big")]
    Big,
}

impl Endianness {
    /// Return true if the endianness matches the endianness of the CPU.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == NATIVE_ENDIAN
    }
}

/// The endianness of the CPU.
pub const NATIVE_ENDIAN: Endianness = if cfg!(target_endian = "big") {
    Endianness::Big
} else {
    Endianness::Little
};

/// Reverse the byte order of every numeric leaf of the packed elements in `bytes`.
///
/// Compound members are swapped individually at their offsets. Strings and references are left untouched.
pub fn reverse_endianness(bytes: &mut [u8], data_type: &DataType) {
    match data_type {
        DataType::Int8
        | DataType::UInt8
        | DataType::FixedString(_)
        | DataType::ObjectReference
        | DataType::VariableString
        | DataType::VariableLength(_) => {}
        DataType::Int16 | DataType::UInt16 => bytes.chunks_exact_mut(2).for_each(<[u8]>::reverse),
        DataType::Int32 | DataType::UInt32 | DataType::Float32 => {
            bytes.chunks_exact_mut(4).for_each(<[u8]>::reverse);
        }
        DataType::Int64 | DataType::UInt64 | DataType::Float64 => {
            bytes.chunks_exact_mut(8).for_each(<[u8]>::reverse);
        }
        DataType::Compound(compound) => {
            if compound.size() == 0 {
                return;
            }
            for element in bytes.chunks_exact_mut(compound.size()) {
                for member in compound.members() {
                    let member_bytes = &mut element[member.offset()..member.offset() + member.size()];
                    reverse_endianness(member_bytes, member.data_type());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::CompoundType;

    #[test]
    fn reverse_endianness_numeric() {
        let mut bytes = vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        reverse_endianness(&mut bytes, &DataType::UInt16);
        assert_eq!(bytes, vec![0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07]);
        reverse_endianness(&mut bytes, &DataType::UInt16);
        reverse_endianness(&mut bytes, &DataType::Float64);
        assert_eq!(bytes, vec![0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn reverse_endianness_compound() {
        let compound = CompoundType::new(vec![
            ("a".to_string(), DataType::UInt8),
            ("b".to_string(), DataType::Int16),
        ])
        .unwrap();
        let data_type = DataType::Compound(compound);
        let mut bytes = vec![1, 2, 3, 4, 5, 6];
        reverse_endianness(&mut bytes, &data_type);
        assert_eq!(bytes, vec![1, 3, 2, 4, 6, 5]);
    }
}
