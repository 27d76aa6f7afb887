use std::str::FromStr;

use derive_more::Display;

use crate::data_type::OBJECT_REFERENCE_SIZE;

use super::WireCodecError;

/// The kind of object an [`ObjectReference`] refers to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum ObjectReferenceKind {
    /// A group.
    #[display("groups")]
    Group,
    /// A committed data type.
    #[display("datatypes")]
    DataType,
    /// A dataset.
    #[display("datasets")]
    Dataset,
}

/// A reference to an object in the array store, `<collection>/<id>`.
///
/// An object reference element is stored as its NUL-padded string in a slot of [`OBJECT_REFERENCE_SIZE`] bytes.
/// A slot of all zeros is a null reference.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Display)]
#[display("{kind}/{id}")]
pub struct ObjectReference {
    kind: ObjectReferenceKind,
    id: String,
}

impl ObjectReference {
    /// Create a new object reference.
    ///
    /// # Errors
    /// Returns [`WireCodecError::InvalidObjectReference`] if the id is empty or the reference does not fit in a slot.
    pub fn new(kind: ObjectReferenceKind, id: impl Into<String>) -> Result<Self, WireCodecError> {
        let reference = Self {
            kind,
            id: id.into(),
        };
        if reference.id.is_empty()
            || reference.id.contains('\0')
            || reference.to_string().len() > OBJECT_REFERENCE_SIZE
        {
            Err(WireCodecError::InvalidObjectReference(reference.to_string()))
        } else {
            Ok(reference)
        }
    }

    /// Return the kind of the referenced object.
    #[must_use]
    pub fn kind(&self) -> ObjectReferenceKind {
        self.kind
    }

    /// Return the id of the referenced object.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read an object reference from a slot, returning [`None`] for a null reference.
    ///
    /// # Errors
    /// Returns [`WireCodecError::InvalidObjectReference`] if the slot does not hold a valid reference.
    pub fn from_slot(slot: &[u8]) -> Result<Option<Self>, WireCodecError> {
        let length = slot.iter().position(|&byte| byte == 0).unwrap_or(slot.len());
        let text = std::str::from_utf8(&slot[..length])
            .map_err(|_| WireCodecError::InvalidObjectReference(format!("{slot:?}")))?;
        if text.is_empty() {
            Ok(None)
        } else {
            text.parse().map(Some)
        }
    }

    /// Write the object reference to a slot, NUL-padding the remainder.
    pub fn to_slot(&self, slot: &mut [u8; OBJECT_REFERENCE_SIZE]) {
        write_slot(Some(self), slot);
    }
}

/// Write `reference` to `slot`, or zero it for a null reference.
pub(super) fn write_slot(reference: Option<&ObjectReference>, slot: &mut [u8]) {
    slot.fill(0);
    if let Some(reference) = reference {
        let text = reference.to_string();
        slot[..text.len()].copy_from_slice(text.as_bytes());
    }
}

impl FromStr for ObjectReference {
    type Err = WireCodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WireCodecError::InvalidObjectReference(s.to_string());
        let (collection, id) = s.split_once('/').ok_or_else(invalid)?;
        let kind = match collection {
            "groups" => ObjectReferenceKind::Group,
            "datatypes" => ObjectReferenceKind::DataType,
            "datasets" => ObjectReferenceKind::Dataset,
            _ => return Err(invalid()),
        };
        Self::new(kind, id).map_err(|_| invalid())
    }
}
