//! Event-family classification for second-generation triggers.
//!
//! The IAM layer cares about which *family* of first-party events an
//! endpoint consumes, not the exact event type: each family maps to a
//! fixed set of service-agent grants. The table is closed — anything not
//! recognized is [`EventFamily::Custom`] and receives only the grants
//! common to all second-generation event triggers.

use serde::{Deserialize, Serialize};

/// Storage object event types (one family, four events).
const STORAGE_EVENTS: [&str; 4] = [
    "google.cloud.storage.object.v1.finalized",
    "google.cloud.storage.object.v1.archived",
    "google.cloud.storage.object.v1.deleted",
    "google.cloud.storage.object.v1.metadataUpdated",
];

const FIREBASE_ALERTS_EVENT: &str = "google.firebase.firebasealerts.alerts.v1.published";
const REMOTE_CONFIG_EVENT: &str = "google.firebase.remoteconfig.remoteConfig.v1.updated";
const TEST_LAB_EVENT: &str = "google.firebase.testlab.testMatrix.v1.completed";

/// The first-party family an event type belongs to.
///
/// # Example
///
/// ```
/// use nimbus_types::EventFamily;
///
/// assert_eq!(
///     EventFamily::of("google.cloud.storage.object.v1.finalized"),
///     EventFamily::Storage,
/// );
/// assert_eq!(
///     EventFamily::of("com.example.ticket.created"),
///     EventFamily::Custom,
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventFamily {
    /// Cloud Storage object events.
    Storage,
    /// Firebase alerts events.
    FirebaseAlerts,
    /// Remote Config update events.
    RemoteConfig,
    /// Test Lab matrix completion events.
    TestLab,
    /// Any event type outside the recognized first-party families.
    Custom,
}

impl EventFamily {
    /// Classifies an event type string.
    #[must_use]
    pub fn of(event_type: &str) -> Self {
        if STORAGE_EVENTS.contains(&event_type) {
            Self::Storage
        } else {
            match event_type {
                FIREBASE_ALERTS_EVENT => Self::FirebaseAlerts,
                REMOTE_CONFIG_EVENT => Self::RemoteConfig,
                TEST_LAB_EVENT => Self::TestLab,
                _ => Self::Custom,
            }
        }
    }

    /// Returns `true` for storage object events, whose delivery path
    /// additionally requires the Cloud Storage service agent to publish to
    /// Pub/Sub.
    #[must_use]
    pub fn is_storage(self) -> bool {
        self == Self::Storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_events_classify_as_storage() {
        for event in STORAGE_EVENTS {
            assert_eq!(EventFamily::of(event), EventFamily::Storage, "{event}");
        }
    }

    #[test]
    fn first_party_families() {
        assert_eq!(
            EventFamily::of(FIREBASE_ALERTS_EVENT),
            EventFamily::FirebaseAlerts
        );
        assert_eq!(
            EventFamily::of(REMOTE_CONFIG_EVENT),
            EventFamily::RemoteConfig
        );
        assert_eq!(EventFamily::of(TEST_LAB_EVENT), EventFamily::TestLab);
    }

    #[test]
    fn unknown_events_are_custom() {
        assert_eq!(
            EventFamily::of("google.cloud.pubsub.topic.v1.messagePublished"),
            EventFamily::Custom
        );
        assert_eq!(EventFamily::of(""), EventFamily::Custom);
    }

    #[test]
    fn storage_predicate() {
        assert!(EventFamily::Storage.is_storage());
        assert!(!EventFamily::TestLab.is_storage());
    }
}
