//! Registry of block storage policies
//!
//! A suite maps the small numeric policy ids stored with inodes to policy
//! objects. It is built once and only read afterwards, so a single instance
//! is shared by every thread that places or re-replicates blocks.

use crate::policy::BlockStoragePolicy;
use std::sync::OnceLock;
use tierio_common::{
    Error, MAX_POLICY_ID, POLICY_ID_UNSPECIFIED, PolicyConfig, Result, SuiteConfig,
};
use tracing::debug;

const SLOTS: usize = MAX_POLICY_ID as usize + 1;

/// Immutable set of storage policies indexed by id
#[derive(Clone, Debug)]
pub struct BlockStoragePolicySuite {
    default_policy_id: u8,
    policies: [Option<BlockStoragePolicy>; SLOTS],
}

static DEFAULT_SUITE: OnceLock<BlockStoragePolicySuite> = OnceLock::new();

/// Get the process-wide standard suite
pub fn default_suite() -> &'static BlockStoragePolicySuite {
    DEFAULT_SUITE.get_or_init(BlockStoragePolicySuite::create_default_suite)
}

impl BlockStoragePolicySuite {
    /// Create a suite from already validated policies
    pub fn new(default_policy_id: u8, policies: Vec<BlockStoragePolicy>) -> Result<Self> {
        let mut slots: [Option<BlockStoragePolicy>; SLOTS] = std::array::from_fn(|_| None);

        for policy in policies {
            if let Some(existing) = slots.iter().flatten().find(|p| {
                p.id() != policy.id() && p.name().eq_ignore_ascii_case(policy.name())
            }) {
                return Err(Error::invalid_policy(format!(
                    "policies {} and {} share the name {}",
                    existing.id(),
                    policy.id(),
                    policy.name()
                )));
            }
            let Some(slot) = slots.get_mut(usize::from(policy.id())) else {
                return Err(Error::invalid_policy(format!(
                    "policy id {} out of range 1..={MAX_POLICY_ID}",
                    policy.id()
                )));
            };
            if let Some(existing) = slot {
                return Err(Error::invalid_policy(format!(
                    "policies {} and {} share the id {}",
                    existing.name(),
                    policy.name(),
                    policy.id()
                )));
            }
            *slot = Some(policy);
        }

        if slots
            .get(usize::from(default_policy_id))
            .and_then(Option::as_ref)
            .is_none()
        {
            return Err(Error::invalid_policy(format!(
                "default policy id {default_policy_id} is not registered"
            )));
        }

        Ok(Self {
            default_policy_id,
            policies: slots,
        })
    }

    /// Create the standard suite: LAZY_PERSIST, ALL_SSD, ONE_SSD, HOT
    /// (default), WARM, COLD and PROVIDED
    #[must_use]
    pub fn create_default_suite() -> Self {
        let config = SuiteConfig::standard();
        let mut policies: [Option<BlockStoragePolicy>; SLOTS] = std::array::from_fn(|_| None);
        let mut default_policy_id = POLICY_ID_UNSPECIFIED;

        for policy in &config.policies {
            if policy.name == config.default_policy {
                default_policy_id = policy.id;
            }
            policies[usize::from(policy.id)] = Some(builtin_policy(policy));
        }

        debug!(default_policy_id, "created default storage policy suite");
        Self {
            default_policy_id,
            policies,
        }
    }

    /// Build a suite from configuration
    pub fn from_config(config: &SuiteConfig) -> Result<Self> {
        let policies = config
            .policies
            .iter()
            .map(BlockStoragePolicy::try_from)
            .collect::<Result<Vec<_>>>()?;

        let default_policy_id = policies
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(&config.default_policy))
            .map(BlockStoragePolicy::id)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "default policy {} is not defined",
                    config.default_policy
                ))
            })?;

        let suite = Self::new(default_policy_id, policies)?;
        debug!(
            policies = suite.all_policies().count(),
            default_policy = suite.default_policy().name(),
            "built storage policy suite from configuration"
        );
        Ok(suite)
    }

    /// Get a policy by id
    #[must_use]
    pub fn get_policy(&self, id: u8) -> Option<&BlockStoragePolicy> {
        self.policies.get(usize::from(id)).and_then(Option::as_ref)
    }

    /// Get a policy by name, ignoring ASCII case
    #[must_use]
    pub fn get_policy_by_name(&self, name: &str) -> Option<&BlockStoragePolicy> {
        self.all_policies()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Policy applied to inodes without an explicit policy
    #[must_use]
    pub fn default_policy(&self) -> &BlockStoragePolicy {
        // `new` and `create_default_suite` only build suites whose default
        // slot is filled
        self.policies[usize::from(self.default_policy_id)]
            .as_ref()
            .unwrap_or_else(|| unreachable!("default policy slot is empty"))
    }

    #[must_use]
    pub const fn default_policy_id(&self) -> u8 {
        self.default_policy_id
    }

    /// All registered policies, highest id first
    pub fn all_policies(&self) -> impl Iterator<Item = &BlockStoragePolicy> {
        self.policies.iter().rev().flatten()
    }

    /// Resolve a policy name for a client request. Unknown names are a user
    /// error.
    pub fn resolve_policy_id(&self, name: &str) -> Result<u8> {
        self.get_policy_by_name(name)
            .map(BlockStoragePolicy::id)
            .ok_or_else(|| Error::policy_not_found(name))
    }

    /// Resolve a policy reference given either as a name or a numeric id
    pub fn resolve_policy(&self, name_or_id: &str) -> Result<&BlockStoragePolicy> {
        match name_or_id.trim().parse::<u8>() {
            Ok(id) => self
                .get_policy(id)
                .ok_or_else(|| Error::policy_not_found(name_or_id)),
            Err(_) => self
                .get_policy_by_name(name_or_id)
                .ok_or_else(|| Error::policy_not_found(name_or_id)),
        }
    }

    /// Policy for the id stored with an inode; an unspecified id means the
    /// default policy
    #[must_use]
    pub fn policy_for_inode(&self, policy_id: u8) -> Option<&BlockStoragePolicy> {
        if policy_id == POLICY_ID_UNSPECIFIED {
            Some(self.default_policy())
        } else {
            self.get_policy(policy_id)
        }
    }

    /// Configuration describing this suite
    #[must_use]
    pub fn to_config(&self) -> SuiteConfig {
        SuiteConfig {
            default_policy: self.default_policy().name().to_string(),
            policies: self.all_policies().map(PolicyConfig::from).collect(),
            ..SuiteConfig::standard()
        }
    }
}

fn builtin_policy(config: &PolicyConfig) -> BlockStoragePolicy {
    BlockStoragePolicy::new_unchecked(
        config.id,
        config.name.clone(),
        config.storage_types.clone(),
        config.creation_fallbacks.clone(),
        config.replication_fallbacks.clone(),
        config.copy_on_create_file,
    )
}
