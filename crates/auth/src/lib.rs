//! `stockroom-auth`: identity and authorization boundary.
//!
//! Decoupled from HTTP and storage: tokens become [`JwtClaims`], claims become
//! a [`Principal`], and [`authorize`] answers whether that principal may
//! perform a ledger operation.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, CommandAuthorization, Principal, authorize, authorize_on_behalf};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::{PrincipalId, TenantMembership};
pub use roles::{Role, permissions_for_roles};
