use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "stock.entries.create"). The wildcard
/// `"*"` grants everything and is what the `admin` role resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const WILDCARD: Permission = Permission::from_static("*");

pub const PRODUCTS_READ: Permission = Permission::from_static("products.read");
pub const PRODUCTS_MANAGE: Permission = Permission::from_static("products.manage");

pub const EMPLOYEES_READ: Permission = Permission::from_static("employees.read");
pub const EMPLOYEES_MANAGE: Permission = Permission::from_static("employees.manage");

pub const ENTRIES_CREATE: Permission = Permission::from_static("stock.entries.create");
/// Deliveries and returns on behalf of any employee.
pub const EXITS_CREATE: Permission = Permission::from_static("stock.exits.create");
/// Deliveries to the caller's own employee record only.
pub const OWN_DELIVERIES_CREATE: Permission = Permission::from_static("stock.deliveries.create.own");

pub const MOVEMENTS_READ: Permission = Permission::from_static("movements.read");
pub const OWN_MOVEMENTS_READ: Permission = Permission::from_static("movements.read.own");

pub const REPORTS_READ: Permission = Permission::from_static("reports.read");
