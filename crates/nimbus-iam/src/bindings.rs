//! Role binding accumulation and set algebra.
//!
//! [`RoleBindingSet`] is the workhorse of reconciliation: desired grants
//! accumulate into it with duplicate-safe insertion, and `diff`/`merge`
//! answer "what is missing from the live policy" and "what should the new
//! policy carry".
//!
//! # Invariants
//!
//! - At most one bucket exists per (role, condition key) pair.
//! - Empty member sets are never retained: `diff` drops buckets that
//!   empty out, and `add` ignores empty member lists.
//! - Iteration order is deterministic (BTree maps throughout), so equal
//!   sets produce equal flat lists.

use crate::condition::condition_key;
use crate::{policy, Condition, IamError, Role};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// One accumulated binding bucket: a role, an optional condition, and the
/// members granted under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The granted role.
    pub role: Role,
    /// Members the role is granted to. Non-empty by construction.
    pub members: BTreeSet<String>,
    /// Condition narrowing the grant, if any.
    pub condition: Option<Condition>,
}

/// A set of role bindings keyed by role × condition.
///
/// # Example
///
/// ```
/// use nimbus_iam::{Role, RoleBindingSet};
///
/// let mut want = RoleBindingSet::new();
/// want.add(
///     Role::try_new("roles/run.invoker").unwrap(),
///     ["serviceAccount:a@example.com".to_string()],
///     None,
/// );
///
/// let have = RoleBindingSet::new();
/// let missing = want.diff(&have);
/// assert!(!missing.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleBindingSet {
    // role -> condition key -> binding
    roles: BTreeMap<Role, BTreeMap<String, Binding>>,
}

impl RoleBindingSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `members` into the (role, condition) bucket, creating the
    /// bucket if absent. Duplicate members are a no-op; an empty member
    /// list inserts nothing.
    pub fn add(
        &mut self,
        role: Role,
        members: impl IntoIterator<Item = String>,
        condition: Option<Condition>,
    ) {
        let mut members = members.into_iter().peekable();
        if members.peek().is_none() {
            return;
        }

        let key = condition_key(condition.as_ref());
        match self.roles.entry(role.clone()).or_default().entry(key) {
            Entry::Occupied(mut bucket) => {
                bucket.get_mut().members.extend(members);
            }
            Entry::Vacant(slot) => {
                slot.insert(Binding {
                    role,
                    members: members.collect(),
                    condition,
                });
            }
        }
    }

    /// Members present in `self` but absent from `other`, per (role,
    /// condition key). Buckets that empty out are dropped.
    #[must_use]
    pub fn diff(&self, other: &RoleBindingSet) -> RoleBindingSet {
        let mut diff = self.clone();
        for binding in other.bindings() {
            let key = condition_key(binding.condition.as_ref());
            let Some(conditions) = diff.roles.get_mut(&binding.role) else {
                continue;
            };
            let Some(bucket) = conditions.get_mut(&key) else {
                continue;
            };
            for member in &binding.members {
                bucket.members.remove(member);
            }
            if bucket.members.is_empty() {
                conditions.remove(&key);
            }
            if conditions.is_empty() {
                diff.roles.remove(&binding.role);
            }
        }
        diff
    }

    /// Union of members per (role, condition key) across both sets.
    #[must_use]
    pub fn merge(&self, other: &RoleBindingSet) -> RoleBindingSet {
        let mut merged = RoleBindingSet::new();
        for binding in self.bindings().chain(other.bindings()) {
            merged.add(
                binding.role.clone(),
                binding.members.iter().cloned(),
                binding.condition.clone(),
            );
        }
        merged
    }

    /// Returns `true` if no bucket holds any member.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Iterates over every bucket in deterministic order.
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.roles.values().flat_map(BTreeMap::values)
    }

    /// Flattens into the wire-shape binding list.
    #[must_use]
    pub fn to_policy_bindings(&self) -> Vec<policy::Binding> {
        self.bindings()
            .map(|binding| policy::Binding {
                role: binding.role.as_str().to_string(),
                members: binding.members.iter().cloned().collect(),
                condition: binding.condition.clone(),
            })
            .collect()
    }

    /// Builds a set from a wire-shape binding list.
    ///
    /// # Errors
    ///
    /// Returns [`IamError::InvalidRole`] if any binding carries a role
    /// without the `"roles/"` prefix.
    pub fn from_policy_bindings(bindings: &[policy::Binding]) -> Result<Self, IamError> {
        let mut set = RoleBindingSet::new();
        for binding in bindings {
            let role = Role::try_new(binding.role.clone())?;
            set.add(role, binding.members.iter().cloned(), binding.condition.clone());
        }
        Ok(set)
    }
}
