//! The transfer negotiator.
//!
//! Decides per array and per call whether element values travel as raw packed bytes or as a JSON value array.

use derive_more::Display;

use crate::{
    data_type::{DataType, DataTypeClass},
    selection::SelectionKind,
};

/// The `Content-Type`/`Accept` of binary transfers.
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// The `Content-Type`/`Accept` of JSON transfers.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// The representation of element values in a transfer.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum TransferMode {
    /// Raw packed elements.
    #[display("binary")]
    Binary,
    /// A JSON value array.
    #[display("JSON")]
    Json,
}

impl TransferMode {
    /// Return the content type of a transfer in this mode.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Binary => CONTENT_TYPE_BINARY,
            Self::Json => CONTENT_TYPE_JSON,
        }
    }
}

/// Choose the transfer mode for elements of class `class` over a selection of `selection_kind`.
///
/// Binary is chosen if the element class is fixed-size and not a reference or variable length class, and the selection is not a point selection.
/// Point selections travel as a JSON body, so their values do too.
#[must_use]
pub fn choose_transfer_mode(
    class: DataTypeClass,
    is_variable_length: bool,
    selection_kind: SelectionKind,
) -> TransferMode {
    let binary_class = !is_variable_length
        && !matches!(
            class,
            DataTypeClass::Reference | DataTypeClass::VariableLength
        );
    if binary_class && selection_kind != SelectionKind::Points {
        TransferMode::Binary
    } else {
        TransferMode::Json
    }
}

/// Choose the transfer mode for elements of `wire_type` over a selection of `selection_kind`.
///
/// A compound containing an object reference member is also transferred as JSON.
#[must_use]
pub fn choose_transfer_mode_for(wire_type: &DataType, selection_kind: SelectionKind) -> TransferMode {
    if contains_reference(wire_type) {
        TransferMode::Json
    } else {
        choose_transfer_mode(
            wire_type.class(),
            wire_type.is_variable_length(),
            selection_kind,
        )
    }
}

/// Returns true if `data_type` is, or has a member that is, an object reference.
pub(crate) fn contains_reference(data_type: &DataType) -> bool {
    match data_type {
        DataType::ObjectReference => true,
        DataType::Compound(compound) => compound
            .members()
            .iter()
            .any(|member| contains_reference(member.data_type())),
        DataType::VariableLength(base) => contains_reference(base),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::CompoundType;

    #[test]
    fn transfer_mode() {
        use SelectionKind::{All, Hyperslab, None, Points};
        assert_eq!(
            choose_transfer_mode(DataTypeClass::Float, false, Hyperslab),
            TransferMode::Binary
        );
        assert_eq!(
            choose_transfer_mode(DataTypeClass::Compound, false, All),
            TransferMode::Binary
        );
        assert_eq!(
            choose_transfer_mode(DataTypeClass::Integer, false, Points),
            TransferMode::Json
        );
        assert_eq!(
            choose_transfer_mode(DataTypeClass::String, true, None),
            TransferMode::Json
        );
        assert_eq!(
            choose_transfer_mode(DataTypeClass::Reference, false, All),
            TransferMode::Json
        );
        assert_eq!(TransferMode::Json.content_type(), "application/json");
    }

    #[test]
    fn transfer_mode_compound_reference() {
        let compound = CompoundType::new(vec![
            ("value".to_string(), DataType::Float32),
            ("ref".to_string(), DataType::ObjectReference),
        ])
        .unwrap();
        assert_eq!(
            choose_transfer_mode_for(&compound.into(), SelectionKind::All),
            TransferMode::Json
        );
        assert_eq!(
            choose_transfer_mode_for(&DataType::FixedString(8), SelectionKind::Hyperslab),
            TransferMode::Binary
        );
    }
}
