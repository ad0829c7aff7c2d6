//! Conditional-access expressions and their bucket keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A conditional-access expression narrowing when a binding applies.
///
/// Two conditions are equal iff their canonical serialization is
/// identical. The canonical form is the serde_json encoding of this
/// struct: field order is fixed by the declaration and absent optional
/// fields are omitted, so structurally equal conditions always serialize
/// to the same bytes.
///
/// # Example
///
/// ```
/// use nimbus_iam::Condition;
///
/// let cond = Condition::new("request.time < timestamp('2030-01-01T00:00:00Z')")
///     .with_title("expires-2030");
/// assert_eq!(cond.title.as_deref(), Some("expires-2030"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// CEL expression evaluated by the backing service.
    pub expression: String,
    /// Short human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Longer description of intent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Condition {
    /// Creates a condition from an expression.
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            title: None,
            description: None,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The stable bucket key for this condition: hex SHA-256 of the
    /// canonical serialization.
    #[must_use]
    pub fn key(&self) -> String {
        // Serializing a Condition cannot fail: all fields are strings.
        let canonical =
            serde_json::to_vec(self).unwrap_or_else(|_| self.expression.clone().into_bytes());
        hex::encode(Sha256::digest(&canonical))
    }
}

/// The bucket key for an optional condition: `""` for unconditional
/// bindings, else [`Condition::key`].
#[must_use]
pub(crate) fn condition_key(condition: Option<&Condition>) -> String {
    condition.map(Condition::key).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_conditions_share_a_key() {
        let a = Condition::new("a condition");
        let b = Condition::new("a condition");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn different_expressions_differ() {
        assert_ne!(
            Condition::new("a condition").key(),
            Condition::new("another condition").key()
        );
    }

    #[test]
    fn title_participates_in_the_key() {
        let bare = Condition::new("expr");
        let titled = Condition::new("expr").with_title("t");
        assert_ne!(bare.key(), titled.key());
    }

    #[test]
    fn unconditional_key_is_empty() {
        assert_eq!(condition_key(None), "");
        let cond = Condition::new("expr");
        assert_eq!(condition_key(Some(&cond)), cond.key());
    }

    #[test]
    fn absent_optional_fields_are_omitted_from_canonical_form() {
        let json = serde_json::to_string(&Condition::new("expr")).expect("serialize");
        assert_eq!(json, r#"{"expression":"expr"}"#);
    }

    #[test]
    fn serde_roundtrip() {
        let cond = Condition::new("request.time < timestamp('2030-01-01T00:00:00Z')")
            .with_title("expires-2030");
        let json = serde_json::to_string(&cond).expect("serialize");
        let parsed: Condition = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, cond);
        assert_eq!(parsed.key(), cond.key());
    }
}
