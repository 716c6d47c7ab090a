use stockroom_auth::{PrincipalId, Role};
use stockroom_core::{AggregateId, TenantId, UserId};

/// Tenant context for a request.
///
/// This is immutable and must be present for all domain routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Principal context for a request (authenticated identity, roles and the
/// employee record the user is linked to, if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal_id: PrincipalId,
    roles: Vec<Role>,
    employee_id: Option<AggregateId>,
}

impl PrincipalContext {
    pub fn new(principal_id: PrincipalId, roles: Vec<Role>, employee_id: Option<AggregateId>) -> Self {
        Self {
            principal_id,
            roles,
            employee_id,
        }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    /// The actor recorded on movements.
    pub fn actor(&self) -> UserId {
        self.principal_id.as_user_id()
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn employee_id(&self) -> Option<AggregateId> {
        self.employee_id
    }
}
