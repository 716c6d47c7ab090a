//! API-side authorization guard.
//!
//! Enforces the role policy at the request boundary (before the ledger is
//! called), keeping the ledger itself auth-agnostic.

use stockroom_auth::{AuthzError, Permission, Principal, TenantMembership, authorize, authorize_on_behalf, permissions_for_roles};
use stockroom_core::AggregateId;

use crate::context::{PrincipalContext, TenantContext};

/// Resolve the request's principal within its tenant.
pub fn principal(tenant: &TenantContext, principal: &PrincipalContext) -> Principal {
    let membership = TenantMembership {
        tenant_id: tenant.tenant_id(),
        roles: principal.roles().to_vec(),
        permissions: permissions_for_roles(principal.roles()),
    };

    Principal {
        principal_id: principal.principal_id(),
        active_tenant_id: tenant.tenant_id(),
        membership,
        employee_id: principal.employee_id(),
    }
}

pub fn require(tenant: &TenantContext, ctx: &PrincipalContext, permission: &Permission) -> Result<(), AuthzError> {
    authorize(&principal(tenant, ctx), permission)
}

/// `any` for every employee, or `own` when `employee` is the caller's own record.
pub fn require_on_behalf(
    tenant: &TenantContext,
    ctx: &PrincipalContext,
    any: &Permission,
    own: &Permission,
    employee: AggregateId,
) -> Result<(), AuthzError> {
    authorize_on_behalf(&principal(tenant, ctx), any, own, employee)
}
