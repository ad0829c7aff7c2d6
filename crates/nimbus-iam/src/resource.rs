//! Policy-bearing resource identifiers.
//!
//! A [`Resource`] names exactly one object that owns its own IAM policy,
//! tagged by the backing service that serves it. Resources are discovered
//! on demand while deriving bindings and never persisted; the full
//! resource name (`//{service}/{path}`) is the interchange form.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const RESOURCE_MANAGER_SERVICE: &str = "cloudresourcemanager.googleapis.com";
const SECRET_MANAGER_SERVICE: &str = "secretmanager.googleapis.com";

/// Error for malformed resource names.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid resource name '{name}'")]
pub struct InvalidResource {
    /// The rejected input.
    pub name: String,
}

/// An object that owns its own IAM policy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    /// A project-level policy, served by the resource manager.
    Project {
        /// Numeric project number as a decimal string.
        number: String,
    },
    /// A secret-level policy, served by the secret manager.
    Secret {
        /// Numeric project number of the owning project.
        project_number: String,
        /// Secret id within the project.
        secret_id: String,
    },
}

impl Resource {
    /// Project-level policy resource.
    #[must_use]
    pub fn project(number: impl Into<String>) -> Self {
        Self::Project {
            number: number.into(),
        }
    }

    /// Secret-level policy resource.
    #[must_use]
    pub fn secret(project_number: impl Into<String>, secret_id: impl Into<String>) -> Self {
        Self::Secret {
            project_number: project_number.into(),
            secret_id: secret_id.into(),
        }
    }

    /// The backing service that owns this resource's policy.
    #[must_use]
    pub fn service(&self) -> &'static str {
        match self {
            Self::Project { .. } => RESOURCE_MANAGER_SERVICE,
            Self::Secret { .. } => SECRET_MANAGER_SERVICE,
        }
    }

    /// The service-relative path component of the full resource name.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Project { number } => format!("projects/{number}"),
            Self::Secret {
                project_number,
                secret_id,
            } => format!("projects/{project_number}/secrets/{secret_id}"),
        }
    }

    /// Splits a full resource name into its service and path components
    /// without classifying the service.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidResource`] unless the input has the
    /// `//{service}/{path}` shape with non-empty components.
    pub fn split(name: &str) -> Result<(&str, &str), InvalidResource> {
        let rest = name.strip_prefix("//").ok_or_else(|| InvalidResource {
            name: name.to_string(),
        })?;
        match rest.split_once('/') {
            Some((service, path)) if !service.is_empty() && !path.is_empty() => {
                Ok((service, path))
            }
            _ => Err(InvalidResource {
                name: name.to_string(),
            }),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}/{}", self.service(), self.path())
    }
}

impl FromStr for Resource {
    type Err = InvalidResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (service, path) = Self::split(s)?;
        let invalid = || InvalidResource {
            name: s.to_string(),
        };

        let segments: Vec<&str> = path.split('/').collect();
        match (service, segments.as_slice()) {
            (RESOURCE_MANAGER_SERVICE, ["projects", number]) if !number.is_empty() => {
                Ok(Self::project(*number))
            }
            (SECRET_MANAGER_SERVICE, ["projects", number, "secrets", secret])
                if !number.is_empty() && !secret.is_empty() =>
            {
                Ok(Self::secret(*number, *secret))
            }
            _ => Err(invalid()),
        }
    }
}
