use crate::error::ApiError;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

/// Subject-id assigned to callers bearing the service automation key.
pub const SERVICE_SUBJECT: &str = "automation-service";

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "TENANT")]
    Tenant,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Tenant => "TENANT",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "TENANT" => Ok(Self::Tenant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved caller identity, inserted into request extensions by the
/// [`authenticate`](super::authenticate) middleware.
#[derive(Debug, Clone)]
pub struct Identity {
    pub subject: String,
    pub email: String,
    pub role: Role,
}

/// Role required by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    /// Any authenticated caller.
    Any,
    /// Admin only.
    Admin,
    /// Tenant endpoints; admins are admitted too.
    Tenant,
}

impl Identity {
    /// The privileged identity mapped to the service automation key.
    #[must_use]
    pub fn service() -> Self {
        Self {
            subject: SERVICE_SUBJECT.to_string(),
            email: "automation@pondok.local".to_string(),
            role: Role::Admin,
        }
    }

    /// Single capability check for every operation.
    ///
    /// Returns `ForbiddenError` (403) when the resolved role does not meet
    /// the requirement — distinct from the 401 an unresolved credential gets.
    pub fn authorize(&self, required: RoleRequirement) -> Result<&Self, ApiError> {
        let allowed = match required {
            RoleRequirement::Any => true,
            RoleRequirement::Admin => self.role == Role::Admin,
            RoleRequirement::Tenant => matches!(self.role, Role::Tenant | Role::Admin),
        };

        if allowed {
            Ok(self)
        } else {
            Err(ApiError::forbidden("Access denied"))
        }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> Identity {
        Identity {
            subject: "user-1".to_string(),
            email: "t@example.com".to_string(),
            role: Role::Tenant,
        }
    }

    #[test]
    fn admin_requirement_rejects_tenant() {
        assert!(tenant().authorize(RoleRequirement::Admin).is_err());
        assert!(Identity::service().authorize(RoleRequirement::Admin).is_ok());
    }

    #[test]
    fn tenant_requirement_admits_admin() {
        assert!(tenant().authorize(RoleRequirement::Tenant).is_ok());
        assert!(Identity::service()
            .authorize(RoleRequirement::Tenant)
            .is_ok());
    }

    #[test]
    fn any_admits_everyone() {
        assert!(tenant().authorize(RoleRequirement::Any).is_ok());
    }

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Tenant.as_str(), "TENANT");
        assert!("PENGHUNI".parse::<Role>().is_err());
    }
}
