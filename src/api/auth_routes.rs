//! Registration, login and profile handlers.

use super::AppState;
use crate::auth::{Identity, Role};
use crate::domain::{NewUser, ProfileUpdate, Room, User};
use crate::error::{ApiError, Result};
use crate::http::{ApiResponse, CreatedResponse, ValidatedJson};
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 2, message = "name must be at least 2 characters"))]
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthBody {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct ProfileBody {
    pub user: User,
    pub tenant: Option<TenantProfile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantProfile {
    pub id: i64,
    pub moved_in_at: DateTime<Utc>,
    pub room: Option<Room>,
}

/// POST /auth/register
///
/// Registers a tenant account and its (initially unassigned) tenancy record.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<CreatedResponse<AuthBody>> {
    let password_hash = state.hasher.hash(&req.password)?;

    let user = state
        .store
        .create_user(NewUser {
            id: format!("user-{}", Uuid::new_v4().simple()),
            email: req.email,
            name: req.name,
            phone: req.phone,
            role: Role::Tenant,
            password_hash: Some(password_hash),
        })
        .await?;

    state.store.create_tenant(&user.id, None).await?;

    let token = state.tokens.issue(&user)?;
    tracing::info!(user = %user.id, "account registered");

    Ok(ApiResponse::created(AuthBody { token, user }))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<ApiResponse<AuthBody>> {
    // One message for every failure mode so accounts cannot be enumerated.
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let (user, hash) = state
        .store
        .user_credentials(&req.email)
        .await?
        .ok_or_else(invalid)?;
    let hash = hash.ok_or_else(invalid)?;

    if !state.hasher.verify(&req.password, &hash)? {
        return Err(invalid());
    }

    let token = state.tokens.issue(&user)?;
    Ok(ApiResponse::success(AuthBody { token, user }))
}

/// GET /profile
pub async fn profile(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<ApiResponse<ProfileBody>> {
    let user = state
        .store
        .find_user(&identity.subject)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    let tenant = match state.store.find_tenant_by_user(&user.id).await? {
        Some(tenant) => {
            let room = match tenant.room_id {
                Some(room_id) => state.store.find_room(room_id).await?,
                None => None,
            };
            Some(TenantProfile {
                id: tenant.id,
                moved_in_at: tenant.moved_in_at,
                room,
            })
        }
        None => None,
    };

    Ok(ApiResponse::success(ProfileBody { user, tenant }))
}

/// PUT /profile
pub async fn update_profile(
    State(state): State<AppState>,
    identity: Identity,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<ApiResponse<UserBody>> {
    let user = state
        .store
        .update_profile(
            &identity.subject,
            ProfileUpdate {
                name: req.name,
                phone: req.phone,
            },
        )
        .await?;

    Ok(ApiResponse::success(UserBody { user }))
}
