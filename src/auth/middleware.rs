use crate::api::AppState;
use crate::auth::identity::{Identity, RoleRequirement};
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

/// Middleware that resolves the bearer credential on every protected route.
///
/// Resolution order: exact match against the configured service automation
/// key (privileged server-to-server callers), then JWT verification. The
/// resolved [`Identity`] is stored in request extensions for handlers and
/// extractors; unresolved credentials are rejected with 401 before any
/// handler runs.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)?;

    let identity = match &state.config.auth.service_key {
        Some(key) if !key.is_empty() && token == key => Identity::service(),
        _ => state.tokens.verify(token)?,
    };

    tracing::debug!(subject = %identity.subject, role = %identity.role, "authenticated");

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Role gate for the admin subtree. Runs after [`authenticate`], before any
/// body parsing, so a wrong role is 403 regardless of input validity.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(&request, RoleRequirement::Admin)?;
    Ok(next.run(request).await)
}

/// Role gate for the tenant subtree (admits admins).
pub async fn require_tenant(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(&request, RoleRequirement::Tenant)?;
    Ok(next.run(request).await)
}

fn require_role(request: &Request, required: RoleRequirement) -> Result<(), ApiError> {
    request
        .extensions()
        .get::<Identity>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?
        .authorize(required)?;
    Ok(())
}

fn bearer_token(request: &Request) -> Result<&str, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))
}
