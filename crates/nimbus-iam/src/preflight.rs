//! Caller-permission preflight checks.
//!
//! Before a deployment mutates anything, these checks verify that the
//! *authenticated caller* (not the functions' runtime identities) holds
//! the permissions the deploy will need. Both checks fail open when the
//! permission test itself errors: the tests are informational, and a
//! transient failure here must not block a deploy that would succeed.
//! They fail closed — with an error naming exactly what is affected —
//! only when the backing service definitively reports the permission
//! missing.

use crate::{IamError, PolicyGateway};
use nimbus_types::{Endpoint, ProjectContext};
use tracing::debug;

/// Permission needed to configure invoker access on new HTTPS functions.
pub const SET_IAM_POLICY_PERMISSION: &str = "cloudfunctions.functions.setIamPolicy";
/// Permission needed to deploy code that runs as a service account.
pub const SERVICE_ACCOUNT_ACT_AS_PERMISSION: &str = "iam.serviceAccounts.actAs";

/// Verifies the caller can set IAM policy before creating new HTTPS
/// endpoints.
///
/// Endpoints already live keep working without this permission, so only
/// HTTPS endpoints present in `want` but not in `have` trigger the test.
///
/// # Errors
///
/// [`IamError::MissingPermission`] listing the new endpoint ids when the
/// permission is definitively missing.
pub async fn check_http_iam<G: PolicyGateway>(
    gateway: &G,
    project: &ProjectContext,
    want: &[Endpoint],
    have: &[Endpoint],
) -> Result<(), IamError> {
    let new_https: Vec<&Endpoint> = want
        .iter()
        .filter(|ep| ep.is_https_triggered())
        .filter(|ep| !have.iter().any(|existing| existing.same_function(ep)))
        .collect();
    if new_https.is_empty() {
        return Ok(());
    }

    debug!(
        count = new_https.len(),
        "found new HTTPS endpoints, testing setIamPolicy permission"
    );
    let resource = format!("projects/{}", project.project_id);
    let check = match gateway
        .test_permissions(&resource, &[SET_IAM_POLICY_PERMISSION.to_string()])
        .await
    {
        Ok(check) => check,
        Err(err) => {
            debug!(error = %err, "setIamPolicy permission check errored, deploy may fail");
            return Ok(());
        }
    };

    if check.passed() {
        debug!("setIamPolicy permission present, proceeding");
        return Ok(());
    }
    Err(IamError::MissingPermission {
        permission: SET_IAM_POLICY_PERMISSION.to_string(),
        subjects: new_https.iter().map(|ep| ep.id.clone()).collect(),
    })
}

/// Verifies the caller may act as the App Engine default service account,
/// the identity first-generation functions deploy under.
///
/// # Errors
///
/// [`IamError::MissingPermission`] naming the service account when the
/// permission is definitively missing.
pub async fn check_service_account_act_as<G: PolicyGateway>(
    gateway: &G,
    project: &ProjectContext,
) -> Result<(), IamError> {
    let email = project.app_engine_service_account();
    let resource = format!("projects/{}/serviceAccounts/{}", project.project_id, email);
    let check = match gateway
        .test_permissions(&resource, &[SERVICE_ACCOUNT_ACT_AS_PERMISSION.to_string()])
        .await
    {
        Ok(check) => check,
        Err(err) => {
            debug!(error = %err, "actAs permission check errored, deploy may fail");
            return Ok(());
        }
    };

    if check.passed() {
        return Ok(());
    }
    Err(IamError::MissingPermission {
        permission: SERVICE_ACCOUNT_ACT_AS_PERMISSION.to_string(),
        subjects: vec![email],
    })
}
