//! Validated IAM role identifier.

use crate::IamError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An IAM role, constrained to the `"roles/"` prefix.
///
/// Construction is the validation point: once a [`Role`] exists it is
/// well-formed, so the binding containers never re-check. Deserialization
/// goes through the same check.
///
/// # Example
///
/// ```
/// use nimbus_iam::Role;
///
/// let role = Role::try_new("roles/run.invoker").unwrap();
/// assert_eq!(role.as_str(), "roles/run.invoker");
///
/// assert!(Role::try_new("run.invoker").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role(String);

impl Role {
    /// Attempts to create a role from a string.
    ///
    /// # Errors
    ///
    /// Returns [`IamError::InvalidRole`] if the string does not start with
    /// `"roles/"`.
    pub fn try_new(role: impl Into<String>) -> Result<Self, IamError> {
        let role = role.into();
        if !role.starts_with("roles/") {
            return Err(IamError::InvalidRole { role });
        }
        Ok(Self(role))
    }

    /// The role as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Role {
    type Error = IamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}
