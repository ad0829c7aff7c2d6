//! Project context and platform-managed identities.
//!
//! A [`ProjectContext`] carries the two identifiers every backing service
//! keys on: the human-readable project id and the numeric project number.
//! The platform-managed service accounts below are deterministic functions
//! of those identifiers, so they are derived rather than looked up.
//!
//! The one identity that is NOT derivable — the Cloud Storage service
//! agent — is resolved through the policy gateway in `nimbus-iam`.

use crate::Platform;
use serde::{Deserialize, Serialize};

/// The target project of a deployment.
///
/// # Example
///
/// ```
/// use nimbus_types::{Platform, ProjectContext};
///
/// let project = ProjectContext::new("my-proj", "123456789");
///
/// assert_eq!(
///     project.default_service_account(Platform::FirstGen),
///     "my-proj@appspot.gserviceaccount.com",
/// );
/// assert_eq!(
///     project.pubsub_service_agent(),
///     "service-123456789@gcp-sa-pubsub.iam.gserviceaccount.com",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Human-readable project id (e.g. `"my-proj"`).
    pub project_id: String,
    /// Numeric project number as a decimal string (e.g. `"123456789"`).
    pub project_number: String,
}

impl ProjectContext {
    /// Creates a new project context.
    #[must_use]
    pub fn new(project_id: impl Into<String>, project_number: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project_number: project_number.into(),
        }
    }

    /// The App Engine default service account, used as the runtime identity
    /// of first-generation functions.
    #[must_use]
    pub fn app_engine_service_account(&self) -> String {
        format!("{}@appspot.gserviceaccount.com", self.project_id)
    }

    /// The default compute service account, used as the runtime identity of
    /// second-generation functions and as the invoker identity of every
    /// Eventarc trigger.
    #[must_use]
    pub fn default_compute_service_account(&self) -> String {
        format!(
            "{}-compute@developer.gserviceaccount.com",
            self.project_number
        )
    }

    /// The Pub/Sub service agent for this project.
    #[must_use]
    pub fn pubsub_service_agent(&self) -> String {
        format!(
            "service-{}@gcp-sa-pubsub.iam.gserviceaccount.com",
            self.project_number
        )
    }

    /// The default runtime service account for the given platform
    /// generation.
    #[must_use]
    pub fn default_service_account(&self, platform: Platform) -> String {
        match platform {
            Platform::FirstGen => self.app_engine_service_account(),
            Platform::SecondGen => self.default_compute_service_account(),
        }
    }
}
