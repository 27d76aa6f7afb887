use std::collections::HashSet;

use super::{DataType, DataTypeError};

/// A named member of a [`CompoundType`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct CompoundMember {
    name: String,
    offset: usize,
    data_type: DataType,
}

impl CompoundMember {
    /// Create a new compound member at byte `offset`.
    #[must_use]
    pub fn new(name: impl Into<String>, offset: usize, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            offset,
            data_type,
        }
    }

    /// Return the member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the member byte offset within the compound.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Return the member data type.
    #[must_use]
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Return the member size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data_type.fixed_size().unwrap_or_default()
    }
}

/// A compound data type: an ordered list of named, fixed-size members.
///
/// Wire compounds are packed (each member offset is the sum of the sizes of the members before it).
/// In-memory compounds may have arbitrary non-overlapping offsets and trailing padding, see [`CompoundType::new_with_layout`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct CompoundType {
    members: Vec<CompoundMember>,
    size: usize,
}

impl CompoundType {
    /// Create a new packed compound type from members in declaration order.
    ///
    /// # Errors
    /// Returns a [`DataTypeError`] if there are no members, a member name is repeated, or a member has a variable size.
    pub fn new(members: Vec<(String, DataType)>) -> Result<Self, DataTypeError> {
        let mut offset = 0;
        let mut packed = Vec::with_capacity(members.len());
        for (name, data_type) in members {
            let size = data_type
                .fixed_size()
                .ok_or_else(|| DataTypeError::VariableSizeMember(name.clone()))?;
            packed.push(CompoundMember::new(name, offset, data_type));
            offset += size;
        }
        Self::new_with_layout(packed, offset)
    }

    /// Create a new compound type with explicit member offsets and total `size`.
    ///
    /// # Errors
    /// Returns a [`DataTypeError`] if there are no members, a member name is repeated, a member has a variable size, or members overlap or extend beyond `size`.
    pub fn new_with_layout(
        members: Vec<CompoundMember>,
        size: usize,
    ) -> Result<Self, DataTypeError> {
        if members.is_empty() {
            return Err(DataTypeError::EmptyCompound);
        }
        let mut names = HashSet::with_capacity(members.len());
        for member in &members {
            if !names.insert(member.name()) {
                return Err(DataTypeError::DuplicateMember(member.name.clone()));
            }
            if member.data_type.fixed_size().is_none() {
                return Err(DataTypeError::VariableSizeMember(member.name.clone()));
            }
            if member.offset + member.size() > size {
                return Err(DataTypeError::MemberOutOfBounds {
                    name: member.name.clone(),
                    offset: member.offset,
                    size,
                });
            }
        }
        let mut by_offset: Vec<&CompoundMember> = members.iter().collect();
        by_offset.sort_by_key(|member| member.offset);
        for pair in by_offset.windows(2) {
            if pair[0].offset + pair[0].size() > pair[1].offset {
                return Err(DataTypeError::OverlappingMembers(
                    pair[0].name.clone(),
                    pair[1].name.clone(),
                ));
            }
        }
        Ok(Self { members, size })
    }

    /// Return the members in declaration order.
    #[must_use]
    pub fn members(&self) -> &[CompoundMember] {
        &self.members
    }

    /// Return the member named `name`, if any.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&CompoundMember> {
        self.members.iter().find(|member| member.name == name)
    }

    /// Return the size of the compound in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Return the number of bytes occupied by members (excluding padding).
    #[must_use]
    pub fn size_used(&self) -> usize {
        self.members.iter().map(CompoundMember::size).sum()
    }
}
