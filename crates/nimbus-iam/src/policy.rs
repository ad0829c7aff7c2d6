//! Wire-shape IAM policy types.
//!
//! These mirror the REST representation the gateway exchanges with the
//! backing services: plain strings, `Vec` members, optional condition.
//! The richer set algebra lives in [`crate::RoleBindingSet`]; conversion
//! between the two is the `to_policy_bindings` / `from_policy_bindings`
//! round trip.

use crate::Condition;
use serde::{Deserialize, Serialize};

/// One (role, members, condition?) tuple as carried by a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Role string, `"roles/"`-prefixed in well-formed policies.
    pub role: String,
    /// Principals the role is granted to.
    pub members: Vec<String>,
    /// Optional conditional-access expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

/// A full IAM policy as held by one resource.
///
/// Fetched fresh per reconciliation attempt and never cached: the `etag`
/// is the optimistic-concurrency token the backing service checks on
/// write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy schema version.
    #[serde(default)]
    pub version: i32,
    /// Optimistic-concurrency token from the most recent read.
    #[serde(default)]
    pub etag: String,
    /// The policy's bindings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,
}

impl Policy {
    /// Returns a copy of this policy carrying `bindings` in place of the
    /// current list. Version and etag are preserved, as required for the
    /// write to be accepted.
    #[must_use]
    pub fn with_bindings(&self, bindings: Vec<Binding>) -> Self {
        Self {
            version: self.version,
            etag: self.etag.clone(),
            bindings,
        }
    }
}
