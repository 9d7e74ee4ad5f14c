//! Authentication and access policy.
//!
//! An inbound bearer credential resolves to an [`Identity`] one of two ways:
//! an exact match against the configured service automation key (mapped to
//! the `automation-service` admin identity), or HS256 JWT verification.
//! Handlers gate themselves through the single
//! [`Identity::authorize`] capability check.

mod identity;
mod middleware;
mod password;
mod token;

pub use identity::{Identity, Role, RoleRequirement, SERVICE_SUBJECT};
pub use middleware::{authenticate, require_admin, require_tenant};
pub use password::PasswordHasher;
pub use token::{Claims, TokenIssuer};
