//! IAM binding derivation and reconciliation for Nimbus function deploys.
//!
//! Before a batch of function endpoints goes live, every
//! service-to-service grant their triggers imply must already exist in
//! the target project's policies. This crate computes those grants from
//! the declarative endpoint set, compares them against the live policies,
//! and applies only the incremental change — safely, idempotently, and
//! per independent resource.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  rules      : endpoint → required (resource, role, members) │
//! │  bindings   : RoleBindingSet — diff / merge algebra         │
//! │  reconciler : plan, short-circuit, fetch→diff→merge→apply   │
//! │  preflight  : caller-permission checks before mutation      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  gateway    : PolicyGateway trait (transport lives outside) │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Pure rules**: the rule table does no I/O and is unit-testable in
//!   isolation; the one looked-up identity is resolved by the reconciler
//!   and passed in.
//! - **Trait at the seam**: [`PolicyGateway`] is defined here and
//!   implemented by consumers; the reconciler receives it by constructor
//!   injection, never through global state.
//! - **Degrade, then aggregate**: an unprovisioned service agent drops
//!   only the grant that needed it; per-resource gateway failures are
//!   collected and surfaced as one error naming every affected resource.
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use nimbus_iam::{PolicyGateway, Reconciler};
//! # use nimbus_types::ProjectContext;
//! # async fn run<G: PolicyGateway>(gateway: Arc<G>) -> Result<(), Box<dyn std::error::Error>> {
//! let reconciler = Reconciler::new(gateway, ProjectContext::new("my-proj", "123456789"));
//! let outcome = reconciler.reconcile(&wanted_endpoints(), &live_endpoints()).await?;
//! if outcome.is_noop() {
//!     println!("all grants already in place");
//! }
//! # Ok(())
//! # }
//! # fn wanted_endpoints() -> Vec<nimbus_types::Endpoint> { Vec::new() }
//! # fn live_endpoints() -> Vec<nimbus_types::Endpoint> { Vec::new() }
//! ```

mod bindings;
mod condition;
mod error;
mod gateway;
pub mod policy;
pub mod preflight;
mod reconciler;
mod resource;
mod role;
pub mod rules;

pub use bindings::{Binding, RoleBindingSet};
pub use condition::Condition;
pub use error::{IamError, ResourceFailure};
pub use gateway::{GatewayError, PermissionCheck, PolicyGateway, ServiceAgent};
pub use policy::Policy;
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use resource::{InvalidResource, Resource};
pub use role::Role;
