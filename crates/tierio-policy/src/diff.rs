//! Expected-versus-existing storage type comparison used when migrating
//! replicas between tiers

use tierio_common::StorageType;

/// Pairing of the types a policy expects for a block with the types its
/// replicas currently occupy
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageTypeDiff {
    expected: Vec<StorageType>,
    existing: Vec<StorageType>,
}

impl StorageTypeDiff {
    #[must_use]
    pub const fn new(expected: Vec<StorageType>, existing: Vec<StorageType>) -> Self {
        Self { expected, existing }
    }

    /// Types still missing after [`remove_overlap`](Self::remove_overlap)
    #[must_use]
    pub fn expected(&self) -> &[StorageType] {
        &self.expected
    }

    /// Replicas left to move after [`remove_overlap`](Self::remove_overlap)
    #[must_use]
    pub fn existing(&self) -> &[StorageType] {
        &self.existing
    }

    /// Drop, one-for-one, every type present on both sides. With
    /// `ignore_non_movable`, transient types are dropped from both sides as
    /// well.
    ///
    /// Returns true when nothing can be migrated: either no replica sits on
    /// a wrong type or no wrong type is left to move to.
    pub fn remove_overlap(&mut self, ignore_non_movable: bool) -> bool {
        let expected = &mut self.expected;
        self.existing.retain(|t| match expected.iter().position(|e| e == t) {
            Some(i) => {
                expected.remove(i);
                false
            }
            None => true,
        });
        if ignore_non_movable {
            self.existing.retain(|t| t.is_movable());
            self.expected.retain(|t| t.is_movable());
        }
        self.is_satisfied()
    }

    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.expected.is_empty() || self.existing.is_empty()
    }
}
