//! Block storage policy implementation
//!
//! A policy names the storage type each replica of a block should live on
//! and the substitutes to use when a preferred type has no room. Policies
//! are immutable once built and are shared freely between threads.

use crate::diff::StorageTypeDiff;
use std::fmt;
use tierio_common::{
    Error, MAX_POLICY_ID, POLICY_ID_UNSPECIFIED, PolicyConfig, Result, StorageType,
    StorageTypeSet, format_storage_types,
};
use tracing::warn;

/// Storage policy for the replicas of a block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockStoragePolicy {
    /// Policy id persisted with inodes
    id: u8,
    /// Display name
    name: String,
    /// Preferred type per replica; the last entry repeats
    storage_types: Vec<StorageType>,
    /// Substitutes, in order, for creating a new block
    creation_fallbacks: Vec<StorageType>,
    /// Substitutes, in order, for re-replicating an existing block
    replication_fallbacks: Vec<StorageType>,
    /// Whether file data is first written to the transient tier
    copy_on_create_file: bool,
}

impl BlockStoragePolicy {
    /// Create a new policy, validating its definition
    pub fn new(
        id: u8,
        name: impl Into<String>,
        storage_types: Vec<StorageType>,
        creation_fallbacks: Vec<StorageType>,
        replication_fallbacks: Vec<StorageType>,
        copy_on_create_file: bool,
    ) -> Result<Self> {
        let policy = Self::new_unchecked(
            id,
            name,
            storage_types,
            creation_fallbacks,
            replication_fallbacks,
            copy_on_create_file,
        );
        policy.validate()?;
        Ok(policy)
    }

    /// Create without validation (built-in policies only)
    #[must_use]
    pub(crate) fn new_unchecked(
        id: u8,
        name: impl Into<String>,
        storage_types: Vec<StorageType>,
        creation_fallbacks: Vec<StorageType>,
        replication_fallbacks: Vec<StorageType>,
        copy_on_create_file: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            storage_types,
            creation_fallbacks,
            replication_fallbacks,
            copy_on_create_file,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.id == POLICY_ID_UNSPECIFIED || self.id > MAX_POLICY_ID {
            return Err(Error::invalid_policy(format!(
                "policy id {} out of range 1..={MAX_POLICY_ID}",
                self.id
            )));
        }
        if self.name.trim().is_empty() {
            return Err(Error::invalid_policy(format!(
                "policy {} has an empty name",
                self.id
            )));
        }
        // The last type fills every slot past the end of the list, so it
        // must be one the placement layer can account for.
        match self.storage_types.last() {
            None => Err(Error::invalid_policy(format!(
                "policy {} has no storage types",
                self.name
            ))),
            Some(last) if last.is_transient() => Err(Error::invalid_policy(format!(
                "policy {} ends with transient storage type {last}",
                self.name
            ))),
            Some(_) => Ok(()),
        }
    }

    #[must_use]
    pub const fn id(&self) -> u8 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn storage_types(&self) -> &[StorageType] {
        &self.storage_types
    }

    #[must_use]
    pub fn creation_fallbacks(&self) -> &[StorageType] {
        &self.creation_fallbacks
    }

    #[must_use]
    pub fn replication_fallbacks(&self) -> &[StorageType] {
        &self.replication_fallbacks
    }

    #[must_use]
    pub const fn is_copy_on_create_file(&self) -> bool {
        self.copy_on_create_file
    }

    /// Storage types for `replication` replicas of a block.
    ///
    /// Transient types are skipped since their usage cannot be tracked by
    /// placement; once the preference list runs out the last type repeats.
    #[must_use]
    pub fn choose_storage_types(&self, replication: usize) -> Vec<StorageType> {
        let mut types: Vec<StorageType> = self
            .storage_types
            .iter()
            .copied()
            .filter(|t| !t.is_transient())
            .take(replication)
            .collect();
        if let Some(&last) = self.storage_types.last() {
            if !last.is_transient() {
                types.resize(replication, last);
            }
        }
        types
    }

    /// Storage types still needed for `replication` replicas when replicas
    /// already exist on `chosen`.
    ///
    /// Existing replicas are matched type-for-type against the target, not
    /// by position.
    #[must_use]
    pub fn choose_storage_types_with_chosen(
        &self,
        replication: usize,
        chosen: &[StorageType],
    ) -> Vec<StorageType> {
        let mut types = self.choose_storage_types(replication);
        diff(&mut types, chosen.iter().copied());
        types
    }

    /// Storage types still needed for `replication` replicas, substituting
    /// fallbacks for types in `unavailables`.
    ///
    /// New blocks use the creation fallbacks, existing blocks the
    /// replication fallbacks. A slot with no available fallback is dropped,
    /// so the result may be shorter than requested.
    #[must_use]
    pub fn choose_storage_types_with_fallback(
        &self,
        replication: usize,
        chosen: &[StorageType],
        unavailables: StorageTypeSet,
        is_new_block: bool,
    ) -> Vec<StorageType> {
        let mut types = self.choose_storage_types(replication);
        let excess = diff(&mut types, chosen.iter().copied());
        let expected = types.len().saturating_sub(excess.len());

        let mut planned = Vec::with_capacity(types.len());
        let mut removed = Vec::new();
        for t in types {
            if !unavailables.contains(t) {
                planned.push(t);
                continue;
            }
            match self.fallback(unavailables, is_new_block) {
                Some(fallback) => planned.push(fallback),
                None => removed.push(t),
            }
        }

        // an existing replica may already sit on the substituted type
        diff(&mut planned, excess);

        if planned.len() < expected {
            warn!(
                expected,
                selected = planned.len(),
                replication,
                planned = %format_storage_types(&planned),
                unavailable = %unavailables,
                removed = %format_storage_types(&removed),
                policy = %self,
                "failed to place enough replicas"
            );
        }
        planned
    }

    /// Storage types among `chosen` that exceed what `replication` replicas
    /// require, in `chosen` order
    #[must_use]
    pub fn choose_excess(&self, replication: usize, chosen: &[StorageType]) -> Vec<StorageType> {
        let mut types = self.choose_storage_types(replication);
        diff(&mut types, chosen.iter().copied())
    }

    /// Substitute type for creating a new block, if any is available
    #[must_use]
    pub fn creation_fallback(&self, unavailables: StorageTypeSet) -> Option<StorageType> {
        first_available(&self.creation_fallbacks, unavailables)
    }

    /// Substitute type for re-replicating a block, if any is available
    #[must_use]
    pub fn replication_fallback(&self, unavailables: StorageTypeSet) -> Option<StorageType> {
        first_available(&self.replication_fallbacks, unavailables)
    }

    /// Creation or replication fallback depending on `is_new_block`
    #[must_use]
    pub fn fallback(&self, unavailables: StorageTypeSet, is_new_block: bool) -> Option<StorageType> {
        if is_new_block {
            self.creation_fallback(unavailables)
        } else {
            self.replication_fallback(unavailables)
        }
    }

    /// Whether replicas on `existing` already satisfy this policy for
    /// `replication` replicas. Transient replicas are ignored.
    #[must_use]
    pub fn is_satisfied_by(&self, replication: usize, existing: &[StorageType]) -> bool {
        let mut diff = StorageTypeDiff::new(self.choose_storage_types(replication), existing.to_vec());
        diff.remove_overlap(true)
    }
}

/// Removes from `target`, one-for-one, every type in `chosen`. Returns the
/// members of `chosen` that matched nothing.
fn diff(
    target: &mut Vec<StorageType>,
    chosen: impl IntoIterator<Item = StorageType>,
) -> Vec<StorageType> {
    let mut unmatched = Vec::new();
    for t in chosen {
        match target.iter().position(|x| *x == t) {
            Some(i) => {
                target.remove(i);
            }
            None => unmatched.push(t),
        }
    }
    unmatched
}

fn first_available(chain: &[StorageType], unavailables: StorageTypeSet) -> Option<StorageType> {
    chain.iter().copied().find(|t| !unavailables.contains(*t))
}

impl fmt::Display for BlockStoragePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockStoragePolicy{{{}:{}, storageTypes={}, creationFallbacks={}, replicationFallbacks={}}}",
            self.name,
            self.id,
            format_storage_types(&self.storage_types),
            format_storage_types(&self.creation_fallbacks),
            format_storage_types(&self.replication_fallbacks),
        )
    }
}

impl TryFrom<&PolicyConfig> for BlockStoragePolicy {
    type Error = Error;

    fn try_from(config: &PolicyConfig) -> Result<Self> {
        Self::new(
            config.id,
            config.name.clone(),
            config.storage_types.clone(),
            config.creation_fallbacks.clone(),
            config.replication_fallbacks.clone(),
            config.copy_on_create_file,
        )
    }
}

impl From<&BlockStoragePolicy> for PolicyConfig {
    fn from(policy: &BlockStoragePolicy) -> Self {
        Self {
            id: policy.id,
            name: policy.name.clone(),
            storage_types: policy.storage_types.clone(),
            creation_fallbacks: policy.creation_fallbacks.clone(),
            replication_fallbacks: policy.replication_fallbacks.clone(),
            copy_on_create_file: policy.copy_on_create_file,
        }
    }
}
