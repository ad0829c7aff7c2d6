//! Unified error interface for Nimbus crates.
//!
//! Every public error type in the workspace implements [`ErrorCode`] so
//! that command frontends and telemetry can treat failures uniformly.
//!
//! # Design
//!
//! - **Machine-readable codes**: stable UPPER_SNAKE_CASE identifiers,
//!   prefixed per crate (`IAM_`, `GATEWAY_`, ...)
//! - **Recoverability info**: whether a retry (or user action) can succeed
//!
//! # Example
//!
//! ```
//! use nimbus_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum DeployError {
//!     QuotaExceeded,
//!     InvalidRegion(String),
//! }
//!
//! impl ErrorCode for DeployError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::QuotaExceeded => "DEPLOY_QUOTA_EXCEEDED",
//!             Self::InvalidRegion(_) => "DEPLOY_INVALID_REGION",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         // Quota frees up; a bad region never becomes valid.
//!         matches!(self, Self::QuotaExceeded)
//!     }
//! }
//!
//! let err = DeployError::QuotaExceeded;
//! assert_eq!(err.code(), "DEPLOY_QUOTA_EXCEEDED");
//! assert!(err.is_recoverable());
//! ```

/// Unified error code interface for Nimbus errors.
///
/// # Code Format
///
/// - **UPPER_SNAKE_CASE**: e.g. `"GATEWAY_STALE_ETAG"`
/// - **Crate-prefixed**: `"IAM_"`, `"GATEWAY_"`, ...
/// - **Stable**: codes are an API contract and never change once defined
///
/// # Recoverability
///
/// An error is recoverable if retrying may succeed or the user can take a
/// corrective action (transient backend failure, unprovisioned service
/// agent). Validation failures and missing permissions are not recoverable
/// by retry.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether a retry or user action can succeed.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows workspace conventions.
///
/// # Panics
///
/// Panics with a descriptive message if the code is empty, lacks the
/// expected prefix, or is not UPPER_SNAKE_CASE. Intended for tests.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with prefix '{expected_prefix}'",
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE",
    );
}

/// Validates every variant of an error enum at once.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
