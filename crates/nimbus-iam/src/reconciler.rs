//! Desired-versus-live policy reconciliation.
//!
//! The [`Reconciler`] turns two endpoint sets (what the deployment wants
//! live, what is already live) into the minimal set of policy writes:
//!
//! ```text
//! want endpoints ──► rule table ──► per-resource RoleBindingSet
//! have endpoints ──► event families ──► already-satisfied short-circuit
//!                                              │
//!              for each remaining resource (concurrently):
//!                  get_policy ──► diff ──► empty? done
//!                                   │
//!                                 merge ──► set_policy (same etag)
//! ```
//!
//! Resources are independent: each runs its own fetch→diff→merge→apply
//! sequence, failures are collected rather than short-circuiting, and the
//! pass fails at the end with one aggregate error if any resource failed.
//! Bindings for one resource are always fully merged before its sequence
//! starts, so a single pass never issues two writes against one resource.

use crate::rules::{self, RuleFamily, RuleInputs};
use crate::{GatewayError, IamError, PolicyGateway, Resource, ResourceFailure, RoleBindingSet};
use nimbus_types::{Endpoint, EventFamily, ProjectContext};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// What a successful reconciliation did per resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Resources whose policy was rewritten.
    pub updated: Vec<Resource>,
    /// Resources whose live policy already satisfied every binding.
    pub unchanged: Vec<Resource>,
    /// Resources skipped entirely by the already-satisfied short-circuit.
    pub skipped: Vec<Resource>,
}

impl ReconcileOutcome {
    /// Returns `true` if the pass issued no policy write.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.updated.is_empty()
    }
}

enum Applied {
    Updated,
    Unchanged,
}

/// Computes and applies the per-resource IAM delta for a deployment.
///
/// Constructed once per command invocation with the gateway injected;
/// holds no other state, so one instance can serve repeated passes.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use nimbus_iam::{PolicyGateway, Reconciler};
/// # use nimbus_types::ProjectContext;
/// # async fn deploy<G: PolicyGateway>(gateway: Arc<G>) -> Result<(), Box<dyn std::error::Error>> {
/// let project = ProjectContext::new("my-proj", "123456789");
/// let reconciler = Reconciler::new(gateway, project);
/// let outcome = reconciler.reconcile(&[], &[]).await?;
/// assert!(outcome.is_noop());
/// # Ok(())
/// # }
/// ```
pub struct Reconciler<G> {
    gateway: Arc<G>,
    project: ProjectContext,
}

impl<G: PolicyGateway> Reconciler<G> {
    /// Creates a reconciler for one target project.
    #[must_use]
    pub fn new(gateway: Arc<G>, project: ProjectContext) -> Self {
        Self { gateway, project }
    }

    /// Ensures every binding the desired endpoints require exists in the
    /// live policies, applying the minimal change per resource.
    ///
    /// # Errors
    ///
    /// - [`IamError::InvalidRole`] if rule derivation produces a
    ///   malformed role (programming error).
    /// - [`IamError::ReconcileFailed`] naming every resource whose
    ///   sequence failed, after all resources were attempted.
    pub async fn reconcile(
        &self,
        want: &[Endpoint],
        have: &[Endpoint],
    ) -> Result<ReconcileOutcome, IamError> {
        let mut failures: Vec<ResourceFailure> = Vec::new();
        let project_resource = Resource::project(&self.project.project_number);

        // Already-satisfied short-circuit, decided before any gateway
        // call: if the live endpoints already exercise every event family
        // the desired set introduces, the service-agent grants are in
        // place from a previous pass.
        let want_families = rules::service_agent_families(want);
        let have_families = rules::service_agent_families(have);
        let skip_service_agents =
            !want_families.is_empty() && want_families.is_subset(&have_families);
        if skip_service_agents {
            debug!(
                families = ?want_families,
                "service-agent grants already satisfied, skipping"
            );
        }

        // The storage agent is the one identity that needs a lookup;
        // resolve it once per pass, and only when rule 2c can still fire.
        let needs_storage_agent =
            !skip_service_agents && want_families.contains(&EventFamily::Storage);
        let mut project_degraded = false;
        let storage_agent = if needs_storage_agent {
            match self.gateway.get_service_account(&self.project.project_id).await {
                Ok(agent) => Some(agent.email_address),
                Err(err) if err.is_not_found() => {
                    warn!(error = %err, "storage agent not provisioned, grant deferred");
                    None
                }
                Err(err) => {
                    // The project resource's desired set would be
                    // incomplete without the agent, so it is not mutated
                    // this pass; everything else still proceeds.
                    project_degraded = true;
                    failures.push(ResourceFailure {
                        resource: project_resource.clone(),
                        error: err,
                    });
                    None
                }
            }
        } else {
            None
        };

        // Derive and group the desired bindings per resource.
        let inputs = RuleInputs {
            project: &self.project,
            storage_agent: storage_agent.as_deref(),
        };
        let mut desired: BTreeMap<Resource, RoleBindingSet> = BTreeMap::new();
        let mut short_circuited: BTreeSet<Resource> = BTreeSet::new();
        for endpoint in want {
            for req in rules::required_bindings(endpoint, &inputs)? {
                if skip_service_agents && matches!(req.family, RuleFamily::ServiceAgent(_)) {
                    short_circuited.insert(req.resource);
                    continue;
                }
                desired
                    .entry(req.resource)
                    .or_default()
                    .add(req.role, req.members, None);
            }
        }
        if project_degraded {
            desired.remove(&project_resource);
        }

        let mut outcome = ReconcileOutcome {
            skipped: short_circuited
                .into_iter()
                .filter(|r| !desired.contains_key(r))
                .collect(),
            ..ReconcileOutcome::default()
        };
        debug!(
            resources = desired.len(),
            skipped = outcome.skipped.len(),
            "computed desired bindings"
        );

        // Fan out across independent resources; each failure is recorded
        // and the rest keep going.
        let attempts = desired.iter().map(|(resource, bindings)| async move {
            (resource.clone(), self.apply_resource(resource, bindings).await)
        });
        for (resource, result) in futures::future::join_all(attempts).await {
            match result {
                Ok(Applied::Updated) => outcome.updated.push(resource),
                Ok(Applied::Unchanged) => outcome.unchanged.push(resource),
                Err(error) => failures.push(ResourceFailure { resource, error }),
            }
        }

        if failures.is_empty() {
            Ok(outcome)
        } else {
            failures.sort_by(|a, b| a.resource.cmp(&b.resource));
            Err(IamError::ReconcileFailed { failures })
        }
    }

    /// One resource's fetch→diff→merge→apply sequence.
    async fn apply_resource(
        &self,
        resource: &Resource,
        desired: &RoleBindingSet,
    ) -> Result<Applied, GatewayError> {
        let live = self.gateway.get_policy(resource).await?;
        // The contract says policies are well-formed; a malformed role in
        // a fetched policy is a gateway-boundary violation, reported as
        // such.
        let live_set = RoleBindingSet::from_policy_bindings(&live.bindings).map_err(|err| {
            GatewayError::Request {
                message: format!("malformed live policy: {err}"),
            }
        })?;

        let delta = desired.diff(&live_set);
        if delta.is_empty() {
            debug!(%resource, "live policy already satisfies desired bindings");
            return Ok(Applied::Unchanged);
        }

        let merged = desired.merge(&live_set);
        let updated = live.with_bindings(merged.to_policy_bindings());
        self.gateway.set_policy(resource, updated).await?;
        debug!(%resource, "policy updated");
        Ok(Applied::Updated)
    }
}
