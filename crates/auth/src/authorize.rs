use std::collections::HashSet;

use thiserror::Error;

use stockroom_core::{AggregateId, TenantId};

use crate::{Permission, PrincipalId, TenantMembership};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
    /// Employee record this principal is, when it is one (self-service deliveries).
    pub employee_id: Option<AggregateId>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Permissions a command requires; checked by the API before calling the ledger.
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

fn granted(principal: &Principal) -> HashSet<&str> {
    principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect()
}

/// Authorize a principal within its active tenant. Pure policy check, no IO.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let perms = granted(principal);
    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Authorize an action that targets one employee's record.
///
/// `any` grants the action for every employee; `own` grants it only when the
/// principal is linked to `target`. A denial names `any`, the broader grant.
pub fn authorize_on_behalf(
    principal: &Principal,
    any: &Permission,
    own: &Permission,
    target: AggregateId,
) -> Result<(), AuthzError> {
    match authorize(principal, any) {
        Ok(()) => return Ok(()),
        Err(AuthzError::TenantMismatch) => return Err(AuthzError::TenantMismatch),
        Err(AuthzError::Forbidden(_)) => {}
    }

    if principal.employee_id == Some(target) && granted(principal).contains(own.as_str()) {
        return Ok(());
    }

    Err(AuthzError::Forbidden(any.as_str().to_string()))
}
