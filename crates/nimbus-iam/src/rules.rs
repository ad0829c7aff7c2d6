//! Binding derivation rules.
//!
//! Pure and deterministic: one endpoint plus project context in, zero or
//! more [`RequiredBinding`]s out. No I/O happens here — the single
//! identity that requires a lookup (the Cloud Storage service agent) is
//! resolved by the caller once per pass and handed in through
//! [`RuleInputs`].
//!
//! # Rule Table
//!
//! | # | Applies to | Resource | Role | Member |
//! |---|------------|----------|------|--------|
//! | 1 | every secret mount | the secret | `secretmanager.secretAccessor` | effective runtime SA |
//! | 2a | 2nd-gen event trigger | project | `iam.serviceAccountTokenCreator` | Pub/Sub agent |
//! | 2b | 2nd-gen event trigger | project | `run.invoker` | default compute SA |
//! | 2c | 2nd-gen storage event | project | `pubsub.publisher` | storage agent (resolved) |
//! | 2d | 2nd-gen alerts/remote-config/test-lab event | project | `eventarc.eventReceiver` | default compute SA |
//! | 3 | genkit callable | project | monitoring triple | explicit SA, else default compute |
//!
//! All applicable rules fire; there is no early exit. First-generation
//! endpoints and non-event triggers contribute nothing under family 2.
//! Re-running over the same endpoint set always yields an equal result.

use crate::{IamError, Resource, Role};
use nimbus_types::{Endpoint, EventFamily, Platform, ProjectContext};
use tracing::debug;

/// Role granted on each mounted secret.
pub const SECRET_ACCESSOR_ROLE: &str = "roles/secretmanager.secretAccessor";
/// Role the Pub/Sub service agent needs to mint push tokens.
pub const SERVICE_ACCOUNT_TOKEN_CREATOR_ROLE: &str = "roles/iam.serviceAccountTokenCreator";
/// Role the trigger identity needs to invoke the backing Cloud Run service.
pub const RUN_INVOKER_ROLE: &str = "roles/run.invoker";
/// Role the trigger identity needs to receive first-party events.
pub const EVENTARC_EVENT_RECEIVER_ROLE: &str = "roles/eventarc.eventReceiver";
/// Role the storage agent needs to publish object events.
pub const PUBSUB_PUBLISHER_ROLE: &str = "roles/pubsub.publisher";
/// Roles a Genkit callable's runtime identity needs for flow monitoring.
pub const GENKIT_MONITORING_ROLES: [&str; 3] = [
    "roles/monitoring.metricWriter",
    "roles/cloudtrace.agent",
    "roles/logging.logWriter",
];

/// Formats a service-account email as an IAM member string.
#[must_use]
pub fn service_account_member(email: &str) -> String {
    format!("serviceAccount:{email}")
}

/// Which rule family produced a requirement.
///
/// The reconciler scopes its already-satisfied short-circuit to the
/// [`ServiceAgent`](RuleFamily::ServiceAgent) family; secret and genkit
/// requirements are always diffed against the live policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFamily {
    /// Rule 1: secret access for the runtime identity.
    SecretAccess,
    /// Rule family 2: service-agent grants for an event trigger, tagged
    /// with the trigger's event family.
    ServiceAgent(EventFamily),
    /// Rule 3: Genkit monitoring roles.
    GenkitMonitoring,
}

/// One derived (resource, role, members) requirement.
///
/// Rules never attach conditions today; the binding containers carry them
/// so that conditional bindings already present in live policies survive
/// merges untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredBinding {
    /// The policy-bearing resource the grant belongs on.
    pub resource: Resource,
    /// The granted role.
    pub role: Role,
    /// Member strings granted the role.
    pub members: Vec<String>,
    /// The family that produced this requirement.
    pub family: RuleFamily,
}

/// Inputs shared by every rule evaluation in one reconciliation pass.
#[derive(Debug, Clone, Copy)]
pub struct RuleInputs<'a> {
    /// The deployment's target project.
    pub project: &'a ProjectContext,
    /// The Cloud Storage service agent email, if resolved. `None` when the
    /// agent is not provisioned yet; rule 2c then contributes nothing.
    pub storage_agent: Option<&'a str>,
}

/// Derives every binding an endpoint requires.
///
/// # Errors
///
/// Returns [`IamError::InvalidRole`] only if a role constant is malformed,
/// which would be a programming error caught by the tests below.
pub fn required_bindings(
    endpoint: &Endpoint,
    inputs: &RuleInputs<'_>,
) -> Result<Vec<RequiredBinding>, IamError> {
    let project = inputs.project;
    let mut required = Vec::new();

    // Rule 1: secret access for the effective runtime identity.
    let runtime_sa = endpoint
        .explicit_service_account()
        .map(str::to_string)
        .unwrap_or_else(|| project.default_service_account(endpoint.platform));
    for secret in &endpoint.secret_env {
        required.push(RequiredBinding {
            resource: Resource::secret(&project.project_number, &secret.secret),
            role: Role::try_new(SECRET_ACCESSOR_ROLE)?,
            members: vec![service_account_member(&runtime_sa)],
            family: RuleFamily::SecretAccess,
        });
    }

    // Rule family 2: second-generation event triggers only.
    if endpoint.platform == Platform::SecondGen {
        if let Some(event_type) = endpoint.event_type() {
            let family = EventFamily::of(event_type);
            let project_resource = Resource::project(&project.project_number);
            let compute_member = service_account_member(&project.default_compute_service_account());

            // 2a: Eventarc delivers over Pub/Sub push; the Pub/Sub agent
            // mints the push auth tokens.
            required.push(RequiredBinding {
                resource: project_resource.clone(),
                role: Role::try_new(SERVICE_ACCOUNT_TOKEN_CREATOR_ROLE)?,
                members: vec![service_account_member(&project.pubsub_service_agent())],
                family: RuleFamily::ServiceAgent(family),
            });

            // 2b: the trigger's invoker identity is not configurable, so
            // this is always the default compute account — never the
            // endpoint's custom runtime identity.
            required.push(RequiredBinding {
                resource: project_resource.clone(),
                role: Role::try_new(RUN_INVOKER_ROLE)?,
                members: vec![compute_member.clone()],
                family: RuleFamily::ServiceAgent(family),
            });

            // 2c: object events reach Eventarc through a topic the
            // storage agent publishes to.
            if family.is_storage() {
                if let Some(agent) = inputs.storage_agent {
                    required.push(RequiredBinding {
                        resource: project_resource.clone(),
                        role: Role::try_new(PUBSUB_PUBLISHER_ROLE)?,
                        members: vec![service_account_member(agent)],
                        family: RuleFamily::ServiceAgent(family),
                    });
                } else {
                    debug!(
                        endpoint = %endpoint.id,
                        "storage agent unresolved, skipping pubsub.publisher grant"
                    );
                }
            }

            // 2d: first-party event families that deliver through the
            // receiver role.
            let needs_receiver = match family {
                EventFamily::FirebaseAlerts | EventFamily::RemoteConfig | EventFamily::TestLab => {
                    true
                }
                EventFamily::Storage | EventFamily::Custom => false,
            };
            if needs_receiver {
                required.push(RequiredBinding {
                    resource: project_resource,
                    role: Role::try_new(EVENTARC_EVENT_RECEIVER_ROLE)?,
                    members: vec![compute_member],
                    family: RuleFamily::ServiceAgent(family),
                });
            }
        }
    }

    // Rule 3: Genkit callables write flow telemetry as their runtime
    // identity; the fallback is always the compute default.
    if endpoint.genkit_action().is_some() {
        let genkit_sa = endpoint
            .explicit_service_account()
            .map(str::to_string)
            .unwrap_or_else(|| project.default_compute_service_account());
        for role in GENKIT_MONITORING_ROLES {
            required.push(RequiredBinding {
                resource: Resource::project(&project.project_number),
                role: Role::try_new(role)?,
                members: vec![service_account_member(&genkit_sa)],
                family: RuleFamily::GenkitMonitoring,
            });
        }
    }

    Ok(required)
}

/// The event families represented by the service-agent rule family across
/// an endpoint set.
///
/// Only second-generation event triggers participate; this is the input
/// to the reconciler's already-satisfied short-circuit. All service-agent
/// grants land on the single project resource, so one set per pass
/// suffices.
#[must_use]
pub fn service_agent_families(endpoints: &[Endpoint]) -> std::collections::BTreeSet<EventFamily> {
    endpoints
        .iter()
        .filter(|ep| ep.platform == Platform::SecondGen)
        .filter_map(|ep| ep.event_type())
        .map(EventFamily::of)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::{SecretBinding, Trigger};

    const PROJECT_ID: &str = "project";
    const PROJECT_NUMBER: &str = "12345";

    fn project() -> ProjectContext {
        ProjectContext::new(PROJECT_ID, PROJECT_NUMBER)
    }

    fn endpoint(platform: Platform, trigger: Trigger) -> Endpoint {
        Endpoint {
            id: "id".to_string(),
            region: "region".to_string(),
            project: PROJECT_ID.to_string(),
            platform,
            trigger,
            service_account: None,
            secret_env: Vec::new(),
        }
    }

    fn derive(endpoint: &Endpoint, storage_agent: Option<&str>) -> Vec<RequiredBinding> {
        let project = project();
        let inputs = RuleInputs {
            project: &project,
            storage_agent,
        };
        required_bindings(endpoint, &inputs).expect("rule table roles are well-formed")
    }

    fn roles_of(required: &[RequiredBinding]) -> Vec<&str> {
        required.iter().map(|r| r.role.as_str()).collect()
    }

    #[test]
    fn no_bindings_without_iam_requirements() {
        // First-generation event trigger and plain HTTPS (example 3).
        let https = endpoint(Platform::FirstGen, Trigger::Https);
        assert!(derive(&https, None).is_empty());

        let v1_event = endpoint(
            Platform::FirstGen,
            Trigger::Event {
                event_type: "some-event".to_string(),
                retry: false,
            },
        );
        assert!(derive(&v1_event, None).is_empty());
    }

    #[test]
    fn second_gen_https_contributes_nothing() {
        assert!(derive(&endpoint(Platform::SecondGen, Trigger::Https), None).is_empty());
        assert!(derive(&endpoint(Platform::SecondGen, Trigger::None), None).is_empty());
    }

    #[test]
    fn secrets_bind_accessor_to_default_service_account() {
        let mut ep = endpoint(Platform::FirstGen, Trigger::Https);
        ep.secret_env = vec![
            SecretBinding {
                key: "MY_SECRET".to_string(),
                secret: "MY_SECRET".to_string(),
                project_id: PROJECT_ID.to_string(),
            },
            SecretBinding {
                key: "ANOTHER_SECRET".to_string(),
                secret: "ANOTHER_SECRET".to_string(),
                project_id: PROJECT_ID.to_string(),
            },
        ];

        let required = derive(&ep, None);
        assert_eq!(required.len(), 2);
        for req in &required {
            assert_eq!(req.role.as_str(), SECRET_ACCESSOR_ROLE);
            assert_eq!(req.family, RuleFamily::SecretAccess);
            assert_eq!(
                req.members,
                vec![format!("serviceAccount:{PROJECT_ID}@appspot.gserviceaccount.com")]
            );
        }
        assert_eq!(
            required[0].resource,
            Resource::secret(PROJECT_NUMBER, "MY_SECRET")
        );
        assert_eq!(
            required[1].resource,
            Resource::secret(PROJECT_NUMBER, "ANOTHER_SECRET")
        );
    }

    #[test]
    fn secrets_bind_accessor_to_custom_service_account() {
        // Example 2: two secrets, explicit SA.
        let mut ep = endpoint(Platform::SecondGen, Trigger::Https);
        ep.service_account = Some("custom@proj.iam.gserviceaccount.com".to_string());
        ep.secret_env = vec![
            SecretBinding {
                key: "A".to_string(),
                secret: "A".to_string(),
                project_id: PROJECT_ID.to_string(),
            },
            SecretBinding {
                key: "B".to_string(),
                secret: "B".to_string(),
                project_id: PROJECT_ID.to_string(),
            },
        ];

        let required = derive(&ep, None);
        assert_eq!(required.len(), 2);
        for req in &required {
            assert_eq!(
                req.members,
                vec!["serviceAccount:custom@proj.iam.gserviceaccount.com".to_string()]
            );
        }
    }

    #[test]
    fn secret_rule_treats_default_placeholder_as_unset() {
        let mut ep = endpoint(Platform::SecondGen, Trigger::Https);
        ep.service_account = Some("default".to_string());
        ep.secret_env = vec![SecretBinding {
            key: "S".to_string(),
            secret: "S".to_string(),
            project_id: PROJECT_ID.to_string(),
        }];

        let required = derive(&ep, None);
        assert_eq!(
            required[0].members,
            vec![format!(
                "serviceAccount:{PROJECT_NUMBER}-compute@developer.gserviceaccount.com"
            )]
        );
    }

    #[test]
    fn second_gen_event_grants_token_creator_and_invoker() {
        let ep = endpoint(
            Platform::SecondGen,
            Trigger::Event {
                event_type: "some-event".to_string(),
                retry: false,
            },
        );

        let required = derive(&ep, None);
        assert_eq!(
            roles_of(&required),
            vec![SERVICE_ACCOUNT_TOKEN_CREATOR_ROLE, RUN_INVOKER_ROLE]
        );
        assert_eq!(
            required[0].members,
            vec![format!(
                "serviceAccount:service-{PROJECT_NUMBER}@gcp-sa-pubsub.iam.gserviceaccount.com"
            )]
        );
        assert_eq!(
            required[1].members,
            vec![format!(
                "serviceAccount:{PROJECT_NUMBER}-compute@developer.gserviceaccount.com"
            )]
        );
        for req in &required {
            assert_eq!(req.resource, Resource::project(PROJECT_NUMBER));
            assert_eq!(req.family, RuleFamily::ServiceAgent(EventFamily::Custom));
        }
    }

    #[test]
    fn invoker_ignores_custom_runtime_identity() {
        let mut ep = endpoint(
            Platform::SecondGen,
            Trigger::Event {
                event_type: "some-event".to_string(),
                retry: false,
            },
        );
        ep.service_account = Some("custom@proj.iam.gserviceaccount.com".to_string());

        let required = derive(&ep, None);
        let invoker = required
            .iter()
            .find(|r| r.role.as_str() == RUN_INVOKER_ROLE)
            .expect("invoker grant present");
        assert_eq!(
            invoker.members,
            vec![format!(
                "serviceAccount:{PROJECT_NUMBER}-compute@developer.gserviceaccount.com"
            )]
        );
    }

    #[test]
    fn storage_event_grants_publisher_to_resolved_agent() {
        // Example 1.
        let ep = endpoint(
            Platform::SecondGen,
            Trigger::Event {
                event_type: "google.cloud.storage.object.v1.finalized".to_string(),
                retry: false,
            },
        );

        let required = derive(&ep, Some("abc@google.com"));
        assert_eq!(
            roles_of(&required),
            vec![
                SERVICE_ACCOUNT_TOKEN_CREATOR_ROLE,
                RUN_INVOKER_ROLE,
                PUBSUB_PUBLISHER_ROLE,
            ]
        );
        let publisher = &required[2];
        assert_eq!(
            publisher.members,
            vec!["serviceAccount:abc@google.com".to_string()]
        );
        assert_eq!(
            publisher.family,
            RuleFamily::ServiceAgent(EventFamily::Storage)
        );
    }

    #[test]
    fn storage_event_degrades_without_agent() {
        let ep = endpoint(
            Platform::SecondGen,
            Trigger::Event {
                event_type: "google.cloud.storage.object.v1.finalized".to_string(),
                retry: false,
            },
        );

        // Unresolved agent drops only the publisher grant.
        let required = derive(&ep, None);
        assert_eq!(
            roles_of(&required),
            vec![SERVICE_ACCOUNT_TOKEN_CREATOR_ROLE, RUN_INVOKER_ROLE]
        );
    }

    #[test]
    fn first_party_families_grant_event_receiver() {
        for event_type in [
            "google.firebase.firebasealerts.alerts.v1.published",
            "google.firebase.remoteconfig.remoteConfig.v1.updated",
            "google.firebase.testlab.testMatrix.v1.completed",
        ] {
            let ep = endpoint(
                Platform::SecondGen,
                Trigger::Event {
                    event_type: event_type.to_string(),
                    retry: false,
                },
            );
            let required = derive(&ep, None);
            let receiver = required
                .iter()
                .find(|r| r.role.as_str() == EVENTARC_EVENT_RECEIVER_ROLE)
                .unwrap_or_else(|| panic!("receiver grant for {event_type}"));
            assert_eq!(
                receiver.members,
                vec![format!(
                    "serviceAccount:{PROJECT_NUMBER}-compute@developer.gserviceaccount.com"
                )]
            );
        }
    }

    #[test]
    fn custom_events_get_no_receiver_grant() {
        let ep = endpoint(
            Platform::SecondGen,
            Trigger::Event {
                event_type: "google.cloud.pubsub.topic.v1.messagePublished".to_string(),
                retry: false,
            },
        );
        let required = derive(&ep, None);
        assert!(required
            .iter()
            .all(|r| r.role.as_str() != EVENTARC_EVENT_RECEIVER_ROLE));
    }

    #[test]
    fn genkit_callable_grants_monitoring_triple_to_default_compute() {
        // Example 4 (project number differs there; shape is what matters).
        let ep = endpoint(
            Platform::SecondGen,
            Trigger::Callable {
                genkit_action: Some("flows/summarize".to_string()),
            },
        );

        let required = derive(&ep, None);
        assert_eq!(roles_of(&required), GENKIT_MONITORING_ROLES.to_vec());
        for req in &required {
            assert_eq!(req.family, RuleFamily::GenkitMonitoring);
            assert_eq!(
                req.members,
                vec![format!(
                    "serviceAccount:{PROJECT_NUMBER}-compute@developer.gserviceaccount.com"
                )]
            );
        }
    }

    #[test]
    fn genkit_callable_prefers_explicit_service_account() {
        let mut ep = endpoint(
            Platform::SecondGen,
            Trigger::Callable {
                genkit_action: Some("flows/summarize".to_string()),
            },
        );
        ep.service_account = Some("genkit@proj.iam.gserviceaccount.com".to_string());

        let required = derive(&ep, None);
        for req in &required {
            assert_eq!(
                req.members,
                vec!["serviceAccount:genkit@proj.iam.gserviceaccount.com".to_string()]
            );
        }
    }

    #[test]
    fn plain_callable_is_not_genkit() {
        let ep = endpoint(
            Platform::SecondGen,
            Trigger::Callable {
                genkit_action: None,
            },
        );
        assert!(derive(&ep, None).is_empty());
    }

    #[test]
    fn derivation_is_deterministic() {
        let mut ep = endpoint(
            Platform::SecondGen,
            Trigger::Event {
                event_type: "google.cloud.storage.object.v1.finalized".to_string(),
                retry: true,
            },
        );
        ep.secret_env = vec![SecretBinding {
            key: "S".to_string(),
            secret: "S".to_string(),
            project_id: PROJECT_ID.to_string(),
        }];

        assert_eq!(derive(&ep, Some("agent@g")), derive(&ep, Some("agent@g")));
    }

    #[test]
    fn service_agent_families_classifies_second_gen_events_only() {
        let endpoints = vec![
            endpoint(
                Platform::SecondGen,
                Trigger::Event {
                    event_type: "google.cloud.storage.object.v1.finalized".to_string(),
                    retry: false,
                },
            ),
            endpoint(
                Platform::SecondGen,
                Trigger::Event {
                    event_type: "google.firebase.testlab.testMatrix.v1.completed".to_string(),
                    retry: false,
                },
            ),
            // Neither of these participates.
            endpoint(
                Platform::FirstGen,
                Trigger::Event {
                    event_type: "google.cloud.storage.object.v1.finalized".to_string(),
                    retry: false,
                },
            ),
            endpoint(Platform::SecondGen, Trigger::Https),
        ];

        let families = service_agent_families(&endpoints);
        assert_eq!(
            families.into_iter().collect::<Vec<_>>(),
            vec![EventFamily::Storage, EventFamily::TestLab]
        );
    }
}
