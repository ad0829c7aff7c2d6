//! Declarative description of one deployable function endpoint.
//!
//! An [`Endpoint`] is what the build pipeline hands to the deploy stages:
//! where the function runs ([`Platform`]), what invokes it ([`Trigger`]),
//! which identity it runs as, and which secrets it mounts.
//!
//! # Design Rationale
//!
//! Both discriminators are closed enums rather than optional trigger
//! fields. Rule tables downstream (IAM binding derivation in `nimbus-iam`)
//! match on them exhaustively, so adding a platform generation or trigger
//! kind is a compile-visible change at every decision point.

use serde::{Deserialize, Serialize};

/// Sentinel value for [`Endpoint::service_account`] meaning "use the
/// platform default identity".
///
/// Some config frontends emit the literal string `"default"` instead of
/// omitting the field; both spellings are treated identically.
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// The hosting generation a function is deployed onto.
///
/// | Variant | Runtime identity default | Event delivery |
/// |---------|--------------------------|----------------|
/// | `FirstGen` | App Engine default SA | direct |
/// | `SecondGen` | default compute SA | Eventarc over Cloud Run |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// First-generation functions platform.
    FirstGen,
    /// Second-generation functions platform (Cloud Run backed).
    SecondGen,
}

/// What invokes an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Trigger {
    /// No trigger configured (declared but inert).
    None,
    /// Plain HTTPS endpoint.
    Https,
    /// Callable endpoint (client SDK invocation).
    Callable {
        /// Set when the callable wraps a Genkit action; the action key
        /// identifies the flow for monitoring.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        genkit_action: Option<String>,
    },
    /// Event-driven endpoint.
    Event {
        /// Fully qualified event type, e.g.
        /// `google.cloud.storage.object.v1.finalized`.
        event_type: String,
        /// Whether delivery is retried on failure.
        #[serde(default)]
        retry: bool,
    },
    /// Scheduled endpoint.
    Schedule {
        /// Cron-style schedule expression.
        schedule: String,
    },
}

/// A secret mounted into an endpoint's environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretBinding {
    /// Environment variable name the secret value is exposed as.
    pub key: String,
    /// Secret id within the project.
    pub secret: String,
    /// Project the secret lives in.
    pub project_id: String,
}

/// One deployable function endpoint.
///
/// # Example
///
/// ```
/// use nimbus_types::{Endpoint, Platform, Trigger};
///
/// let endpoint = Endpoint {
///     id: "onupload".to_string(),
///     region: "us-central1".to_string(),
///     project: "my-proj".to_string(),
///     platform: Platform::SecondGen,
///     trigger: Trigger::Event {
///         event_type: "google.cloud.storage.object.v1.finalized".to_string(),
///         retry: true,
///     },
///     service_account: None,
///     secret_env: Vec::new(),
/// };
///
/// assert!(endpoint.is_event_triggered());
/// assert_eq!(
///     endpoint.event_type(),
///     Some("google.cloud.storage.object.v1.finalized"),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Function id, unique within (project, region).
    pub id: String,
    /// Deployment region.
    pub region: String,
    /// Owning project id.
    pub project: String,
    /// Hosting generation.
    pub platform: Platform,
    /// Trigger configuration.
    pub trigger: Trigger,
    /// Explicit runtime service account email, if configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    /// Secrets mounted into the runtime environment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_env: Vec<SecretBinding>,
}

impl Endpoint {
    /// Returns `true` if this endpoint is event-driven.
    #[must_use]
    pub fn is_event_triggered(&self) -> bool {
        matches!(self.trigger, Trigger::Event { .. })
    }

    /// Returns `true` if this endpoint is a plain HTTPS endpoint.
    #[must_use]
    pub fn is_https_triggered(&self) -> bool {
        matches!(self.trigger, Trigger::Https)
    }

    /// Returns `true` if this endpoint is callable.
    #[must_use]
    pub fn is_callable_triggered(&self) -> bool {
        matches!(self.trigger, Trigger::Callable { .. })
    }

    /// The event type, for event-driven endpoints.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        match &self.trigger {
            Trigger::Event { event_type, .. } => Some(event_type),
            _ => None,
        }
    }

    /// The Genkit action key, for callable endpoints wrapping a Genkit
    /// flow.
    #[must_use]
    pub fn genkit_action(&self) -> Option<&str> {
        match &self.trigger {
            Trigger::Callable {
                genkit_action: Some(action),
            } => Some(action),
            _ => None,
        }
    }

    /// The explicitly configured runtime service account, with the
    /// `"default"` placeholder normalized away.
    #[must_use]
    pub fn explicit_service_account(&self) -> Option<&str> {
        self.service_account
            .as_deref()
            .filter(|sa| *sa != DEFAULT_SERVICE_ACCOUNT)
    }

    /// Returns `true` if `other` names the same function (same id, region
    /// and project), regardless of configuration differences.
    #[must_use]
    pub fn same_function(&self, other: &Endpoint) -> bool {
        self.id == other.id && self.region == other.region && self.project == other.project
    }
}
