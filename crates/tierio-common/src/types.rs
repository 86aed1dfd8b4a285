//! Core type definitions for tierio
//!
//! This module defines the storage media tiers a replica can live on, the
//! compact set type used to describe tier availability, and the policy id
//! constants shared by every component.

use crate::error::Error;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of bits a policy id occupies when stored with an inode
pub const POLICY_ID_BIT_LENGTH: u32 = 4;

/// Largest policy id that fits in [`POLICY_ID_BIT_LENGTH`] bits
pub const MAX_POLICY_ID: u8 = (1 << POLICY_ID_BIT_LENGTH) - 1;

/// Policy id stored on inodes that never had a policy set
pub const POLICY_ID_UNSPECIFIED: u8 = 0;

/// Standard policy ids
pub mod policy_ids {
    pub const PROVIDED: u8 = 1;
    pub const COLD: u8 = 2;
    pub const WARM: u8 = 5;
    pub const HOT: u8 = 7;
    pub const ONE_SSD: u8 = 10;
    pub const ALL_SSD: u8 = 12;
    pub const LAZY_PERSIST: u8 = 15;
}

/// Standard policy names
pub mod policy_names {
    pub const PROVIDED: &str = "PROVIDED";
    pub const COLD: &str = "COLD";
    pub const WARM: &str = "WARM";
    pub const HOT: &str = "HOT";
    pub const ONE_SSD: &str = "ONE_SSD";
    pub const ALL_SSD: &str = "ALL_SSD";
    pub const LAZY_PERSIST: &str = "LAZY_PERSIST";
}

/// Physical storage media tier.
///
/// Declaration order is the canonical total order: it drives set iteration
/// and sorting when type multisets are compared.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum StorageType {
    /// Memory-backed volume, contents lost on restart
    #[display("RAM_DISK")]
    RamDisk = 0,
    /// Solid-state drive
    #[display("SSD")]
    Ssd = 1,
    /// Spinning disk
    #[display("DISK")]
    Disk = 2,
    /// High-density, low-compute archival storage
    #[display("ARCHIVE")]
    Archive = 3,
    /// Data living in an external store, referenced by alias
    #[display("PROVIDED")]
    Provided = 4,
}

impl StorageType {
    /// Every storage type, in canonical order
    pub const ALL: [Self; 5] = [
        Self::RamDisk,
        Self::Ssd,
        Self::Disk,
        Self::Archive,
        Self::Provided,
    ];

    /// Type used when a volume does not declare one
    pub const DEFAULT: Self = Self::Disk;

    /// Whether replicas on this type are lost on restart
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::RamDisk)
    }

    /// Whether this type is backed by memory
    #[must_use]
    pub const fn is_ram(self) -> bool {
        matches!(self, Self::RamDisk)
    }

    /// Whether the mover may migrate replicas to or from this type
    #[must_use]
    pub const fn is_movable(self) -> bool {
        !self.is_transient()
    }

    /// Whether per-type quotas can be set for this type
    #[must_use]
    pub const fn supports_type_quota(self) -> bool {
        !self.is_transient()
    }

    /// Position in the canonical order
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Inverse of [`ordinal`](Self::ordinal)
    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::RamDisk),
            1 => Some(Self::Ssd),
            2 => Some(Self::Disk),
            3 => Some(Self::Archive),
            4 => Some(Self::Provided),
            _ => None,
        }
    }

    /// Canonical upper-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RamDisk => "RAM_DISK",
            Self::Ssd => "SSD",
            Self::Disk => "DISK",
            Self::Archive => "ARCHIVE",
            Self::Provided => "PROVIDED",
        }
    }

    /// Types the mover is allowed to migrate between
    pub fn movable_types() -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(|t| t.is_movable())
    }

    /// Types that accept a per-type quota
    pub fn types_supporting_quota() -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(|t| t.supports_type_quota())
    }
}

impl FromStr for StorageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("DEFAULT") {
            return Ok(Self::DEFAULT);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownStorageType(s.to_string()))
    }
}

impl TryFrom<String> for StorageType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Render a slice of types the way policies print them: `[DISK, ARCHIVE]`
pub fn format_storage_types(types: &[StorageType]) -> String {
    let names: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
    format!("[{}]", names.join(", "))
}

/// Set of storage types, one bit per ordinal
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StorageTypeSet(u8);

impl StorageTypeSet {
    /// The empty set
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set containing every storage type
    #[must_use]
    pub fn all() -> Self {
        Self::ALL_BITS
    }

    const ALL_BITS: Self = Self((1 << StorageType::ALL.len()) - 1);

    /// Set containing exactly the given types
    #[must_use]
    pub fn of(types: &[StorageType]) -> Self {
        types.iter().copied().collect()
    }

    const fn bit(t: StorageType) -> u8 {
        1 << t.ordinal()
    }

    /// Add a type, returning whether it was newly inserted
    pub fn insert(&mut self, t: StorageType) -> bool {
        let added = !self.contains(t);
        self.0 |= Self::bit(t);
        added
    }

    /// Remove a type, returning whether it was present
    pub fn remove(&mut self, t: StorageType) -> bool {
        let present = self.contains(t);
        self.0 &= !Self::bit(t);
        present
    }

    #[must_use]
    pub const fn contains(&self, t: StorageType) -> bool {
        self.0 & Self::bit(t) != 0
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Complement within the closed type set
    #[must_use]
    pub const fn complement(self) -> Self {
        Self(!self.0 & Self::ALL_BITS.0)
    }

    /// Members in canonical order
    pub fn iter(&self) -> impl Iterator<Item = StorageType> + '_ {
        StorageType::ALL.into_iter().filter(|t| self.contains(*t))
    }
}

impl FromIterator<StorageType> for StorageTypeSet {
    fn from_iter<I: IntoIterator<Item = StorageType>>(iter: I) -> Self {
        let mut set = Self::empty();
        for t in iter {
            set.insert(t);
        }
        set
    }
}

impl Extend<StorageType> for StorageTypeSet {
    fn extend<I: IntoIterator<Item = StorageType>>(&mut self, iter: I) {
        for t in iter {
            self.insert(t);
        }
    }
}

impl fmt::Debug for StorageTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for StorageTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<StorageType> = self.iter().collect();
        f.write_str(&format_storage_types(&types))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_order() {
        let mut types = vec![
            StorageType::Archive,
            StorageType::Provided,
            StorageType::RamDisk,
            StorageType::Disk,
            StorageType::Ssd,
        ];
        types.sort();
        assert_eq!(types, StorageType::ALL.to_vec());

        for t in StorageType::ALL {
            assert_eq!(StorageType::from_ordinal(t.ordinal()), Some(t));
        }
        assert_eq!(StorageType::from_ordinal(5), None);
    }

    #[test]
    fn test_transient_flags() {
        assert!(StorageType::RamDisk.is_transient());
        assert!(StorageType::RamDisk.is_ram());
        assert!(!StorageType::RamDisk.is_movable());
        for t in [
            StorageType::Ssd,
            StorageType::Disk,
            StorageType::Archive,
            StorageType::Provided,
        ] {
            assert!(!t.is_transient(), "{t} should be persistent");
            assert!(t.is_movable());
            assert!(t.supports_type_quota());
        }
        assert_eq!(StorageType::movable_types().count(), 4);
        assert_eq!(StorageType::types_supporting_quota().count(), 4);
    }

    #[test]
    fn test_parse_storage_type() {
        assert_eq!("DISK".parse::<StorageType>().unwrap(), StorageType::Disk);
        assert_eq!("ram_disk".parse::<StorageType>().unwrap(), StorageType::RamDisk);
        assert_eq!(" archive ".parse::<StorageType>().unwrap(), StorageType::Archive);
        assert_eq!("DEFAULT".parse::<StorageType>().unwrap(), StorageType::Disk);
        assert!(matches!(
            "TAPE".parse::<StorageType>(),
            Err(Error::UnknownStorageType(name)) if name == "TAPE"
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(StorageType::RamDisk.to_string(), "RAM_DISK");
        assert_eq!(StorageType::Provided.to_string(), "PROVIDED");
        assert_eq!(
            format_storage_types(&[StorageType::Disk, StorageType::Archive]),
            "[DISK, ARCHIVE]"
        );
        assert_eq!(format_storage_types(&[]), "[]");
    }

    #[test]
    fn test_storage_type_set() {
        let mut set = StorageTypeSet::empty();
        assert!(set.is_empty());
        assert!(set.insert(StorageType::Archive));
        assert!(set.insert(StorageType::Ssd));
        assert!(!set.insert(StorageType::Ssd));
        assert_eq!(set.len(), 2);
        assert!(set.contains(StorageType::Ssd));
        assert!(!set.contains(StorageType::Disk));

        // iteration follows the canonical order, not insertion order
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![StorageType::Ssd, StorageType::Archive]
        );
        assert_eq!(set.to_string(), "[SSD, ARCHIVE]");

        assert!(set.remove(StorageType::Ssd));
        assert!(!set.remove(StorageType::Ssd));
        assert_eq!(set, StorageTypeSet::of(&[StorageType::Archive]));

        let all = StorageTypeSet::all();
        assert_eq!(all.len(), StorageType::ALL.len());
        assert_eq!(all.complement(), StorageTypeSet::empty());
        assert_eq!(
            set.complement(),
            StorageTypeSet::of(&[
                StorageType::RamDisk,
                StorageType::Ssd,
                StorageType::Disk,
                StorageType::Provided,
            ])
        );
        assert_eq!(set.union(set.complement()), all);
        assert_eq!(all.difference(set), set.complement());
    }

    #[test]
    fn test_serde_names() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            types: Vec<StorageType>,
        }

        let parsed: Wrapper = toml::from_str(r#"types = ["RAM_DISK", "ssd", "DEFAULT"]"#).unwrap();
        assert_eq!(
            parsed.types,
            vec![StorageType::RamDisk, StorageType::Ssd, StorageType::Disk]
        );

        let rendered = toml::to_string(&Wrapper {
            types: vec![StorageType::RamDisk, StorageType::Archive],
        })
        .unwrap();
        assert!(rendered.contains(r#"["RAM_DISK", "ARCHIVE"]"#), "{rendered}");
    }
}
