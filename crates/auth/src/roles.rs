use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::permissions::{self, Permission};

/// Role identifier used for RBAC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: &'static str = "admin";
    pub const DELIVERY_MANAGER: &'static str = "delivery_manager";
    pub const AUDITOR: &'static str = "auditor";
    pub const EMPLOYEE: &'static str = "employee";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Permissions granted by this role. Unknown roles grant nothing.
    pub fn permissions(&self) -> Vec<Permission> {
        match self.as_str() {
            Self::ADMIN => vec![permissions::WILDCARD],
            Self::DELIVERY_MANAGER => vec![
                permissions::PRODUCTS_READ,
                permissions::EMPLOYEES_READ,
                permissions::ENTRIES_CREATE,
                permissions::EXITS_CREATE,
                permissions::MOVEMENTS_READ,
                permissions::REPORTS_READ,
            ],
            Self::AUDITOR => vec![
                permissions::PRODUCTS_READ,
                permissions::EMPLOYEES_READ,
                permissions::MOVEMENTS_READ,
                permissions::REPORTS_READ,
            ],
            Self::EMPLOYEE => vec![
                permissions::PRODUCTS_READ,
                permissions::OWN_DELIVERIES_CREATE,
                permissions::OWN_MOVEMENTS_READ,
            ],
            _ => Vec::new(),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Union of the permissions granted by `roles`, deduplicated, in grant order.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    for perm in roles.iter().flat_map(Role::permissions) {
        if !out.contains(&perm) {
            out.push(perm);
        }
    }
    out
}
