//! tierio Policy - Tiered block storage policies
//!
//! This crate decides which storage media type each replica of a block
//! should be placed on, or removed from, according to the storage policy of
//! the file it belongs to.
//!
//! # Selection
//!
//! ## Placement
//! [`BlockStoragePolicy::choose_storage_types`] and its variants return the
//! storage types still needed for a block, walking the policy's creation or
//! replication fallbacks when a preferred type has no room.
//!
//! ## Excess removal
//! [`BlockStoragePolicy::choose_excess`] returns the types of replicas that
//! exceed what the policy requires.
//!
//! # Example
//! ```
//! use tierio_common::{StorageType, StorageTypeSet, policy_ids};
//! use tierio_policy::default_suite;
//!
//! let hot = default_suite().get_policy(policy_ids::HOT).unwrap();
//! let disk_full = StorageTypeSet::of(&[StorageType::Disk]);
//! let plan = hot.choose_storage_types_with_fallback(3, &[], disk_full, false);
//! assert_eq!(plan, vec![StorageType::Archive; 3]);
//! ```

pub mod diff;
pub mod policy;
pub mod suite;

pub use diff::StorageTypeDiff;
pub use policy::BlockStoragePolicy;
pub use suite::{BlockStoragePolicySuite, default_suite};
