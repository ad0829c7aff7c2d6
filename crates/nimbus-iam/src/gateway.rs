//! Policy gateway contract.
//!
//! [`PolicyGateway`] is the seam between the reconciliation core and the
//! backing services' REST surfaces. The trait is defined here and
//! implemented by consumers (the transport crate in production, recording
//! mocks in tests); the core never constructs one itself — it receives the
//! gateway by constructor injection.
//!
//! # Architecture
//!
//! ```text
//! PolicyGateway trait (nimbus-iam)   ← contract definition
//!          │
//!          ├── RestGateway (transport crate)   ← authenticated REST impl
//!          └── mock gateways (tests)           ← scripted fixtures
//! ```
//!
//! No call is retried at this layer; retry policy, timeouts and
//! authentication belong to the implementation behind the trait.

use crate::{Policy, Resource};
use async_trait::async_trait;
use nimbus_types::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by gateway implementations.
///
/// | Error | Code | Recoverable |
/// |-------|------|-------------|
/// | [`GatewayError::AgentNotFound`] | `GATEWAY_AGENT_NOT_FOUND` | Yes |
/// | [`GatewayError::StaleEtag`] | `GATEWAY_STALE_ETAG` | Yes |
/// | [`GatewayError::Request`] | `GATEWAY_REQUEST` | Yes |
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The backing service has no linked service agent for the project
    /// yet. Callers treat this as non-fatal and skip the dependent rule's
    /// contribution.
    #[error("no service agent linked for project '{project_id}'")]
    AgentNotFound {
        /// Project the lookup ran against.
        project_id: String,
    },

    /// The policy write carried an etag older than the resource's current
    /// one. Not retried here; the next reconciliation pass re-fetches.
    #[error("stale policy etag for '{resource}'")]
    StaleEtag {
        /// Full resource name of the rejected write.
        resource: String,
    },

    /// Any other failure from the backing service or transport.
    #[error("gateway request failed: {message}")]
    Request {
        /// Implementation-provided description.
        message: String,
    },
}

impl GatewayError {
    /// Returns `true` for the NotFound-style case the rules layer degrades
    /// on.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AgentNotFound { .. })
    }
}

impl ErrorCode for GatewayError {
    fn code(&self) -> &'static str {
        match self {
            Self::AgentNotFound { .. } => "GATEWAY_AGENT_NOT_FOUND",
            Self::StaleEtag { .. } => "GATEWAY_STALE_ETAG",
            Self::Request { .. } => "GATEWAY_REQUEST",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Agents get provisioned, conflicting writers finish, transports
        // come back; a later pass may succeed for every variant.
        true
    }
}

/// A platform-managed service agent identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAgent {
    /// The agent's service-account email.
    pub email_address: String,
}

/// Result of a permission test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCheck {
    /// Permissions the caller holds.
    pub allowed: Vec<String>,
    /// Permissions the caller lacks.
    pub missing: Vec<String>,
}

impl PermissionCheck {
    /// Returns `true` if every tested permission is held.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.missing.is_empty()
    }
}

/// External collaborator contract for policy access.
///
/// Implementations must be cheap to share (`&self` methods only) and are
/// expected to enforce optimistic concurrency: [`set_policy`] must carry
/// the etag from the most recent [`get_policy`] and the backing service is
/// assumed to reject stale etags.
///
/// [`get_policy`]: PolicyGateway::get_policy
/// [`set_policy`]: PolicyGateway::set_policy
#[async_trait]
pub trait PolicyGateway: Send + Sync {
    /// Resolves the Cloud Storage service agent for a project.
    ///
    /// # Errors
    ///
    /// [`GatewayError::AgentNotFound`] when no agent is linked yet; any
    /// other failure as [`GatewayError`].
    async fn get_service_account(&self, project_id: &str) -> Result<ServiceAgent, GatewayError>;

    /// Fetches the authoritative policy for a resource.
    async fn get_policy(&self, resource: &Resource) -> Result<Policy, GatewayError>;

    /// Replaces the policy for a resource, returning the stored policy.
    async fn set_policy(&self, resource: &Resource, policy: Policy)
        -> Result<Policy, GatewayError>;

    /// Tests whether the authenticated caller holds `permissions` on the
    /// named resource (service-relative name, e.g. `projects/my-proj`).
    async fn test_permissions(
        &self,
        resource: &str,
        permissions: &[String],
    ) -> Result<PermissionCheck, GatewayError>;
}
