//! IAM engine errors.
//!
//! # Error Code Convention
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`IamError::InvalidRole`] | `IAM_INVALID_ROLE` | No |
//! | [`IamError::InvalidResource`] | `IAM_INVALID_RESOURCE` | No |
//! | [`IamError::MissingPermission`] | `IAM_MISSING_PERMISSION` | No |
//! | [`IamError::ReconcileFailed`] | `IAM_RECONCILE_FAILED` | Yes |
//!
//! Validation failures are fatal and immediate: a malformed role or
//! resource never becomes valid on retry. A failed reconciliation is
//! recoverable — every failure it aggregates is a gateway failure, and a
//! later pass re-fetches and retries from scratch.

use crate::{GatewayError, InvalidResource, Resource};
use nimbus_types::ErrorCode;
use thiserror::Error;

/// One resource's failure within a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFailure {
    /// The resource whose sequence failed.
    pub resource: Resource,
    /// What the gateway reported.
    pub error: GatewayError,
}

fn render_failures(failures: &[ResourceFailure]) -> String {
    let details: Vec<String> = failures
        .iter()
        .map(|f| format!("{}: {}", f.resource, f.error))
        .collect();
    format!(
        "failed to update IAM policies for {} resource(s): {}",
        failures.len(),
        details.join("; "),
    )
}

/// Errors from binding derivation, preflight and reconciliation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IamError {
    /// A role string without the `"roles/"` prefix.
    #[error("invalid role '{role}': must be prefixed with \"roles/\"")]
    InvalidRole {
        /// The rejected role string.
        role: String,
    },

    /// A malformed resource name.
    #[error(transparent)]
    InvalidResource(#[from] InvalidResource),

    /// The authenticated caller lacks a permission the deployment needs.
    #[error("missing permission '{permission}' required for: {}", .subjects.join(", "))]
    MissingPermission {
        /// The permission that was tested and found missing.
        permission: String,
        /// What needs it (endpoint ids, service-account emails).
        subjects: Vec<String>,
    },

    /// One or more resources could not be brought up to date. Every
    /// independent resource was still attempted; the failures list names
    /// each one and its cause.
    #[error("{}", render_failures(.failures))]
    ReconcileFailed {
        /// Per-resource failures, in resource order.
        failures: Vec<ResourceFailure>,
    },
}

impl ErrorCode for IamError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRole { .. } => "IAM_INVALID_ROLE",
            Self::InvalidResource(_) => "IAM_INVALID_RESOURCE",
            Self::MissingPermission { .. } => "IAM_MISSING_PERMISSION",
            Self::ReconcileFailed { .. } => "IAM_RECONCILE_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::ReconcileFailed { .. })
    }
}

impl From<ResourceFailure> for IamError {
    fn from(failure: ResourceFailure) -> Self {
        Self::ReconcileFailed {
            failures: vec![failure],
        }
    }
}
