//! Room listing and administration handlers.

use super::AppState;
use crate::auth::{Identity, RoleRequirement};
use crate::domain::{NewRoom, Room, RoomStatus, RoomType, RoomUpdate};
use crate::error::Result;
use crate::http::{ApiResponse, CreatedResponse, ValidatedJson};
use crate::store::RoomWithOccupant;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, message = "room number is required"))]
    pub number: String,
    pub room_type: RoomType,
    #[validate(range(min = 1, message = "monthly rate must be positive"))]
    pub monthly_rate: i64,
    pub amenities: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomRequest {
    pub room_type: Option<RoomType>,
    #[validate(range(min = 1, message = "monthly rate must be positive"))]
    pub monthly_rate: Option<i64>,
    pub status: Option<RoomStatus>,
    pub amenities: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoomList {
    pub rooms: Vec<RoomWithOccupant>,
}

#[derive(Debug, Serialize)]
pub struct RoomBody {
    pub room: Room,
}

/// GET /kamar — any authenticated caller.
pub async fn list(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<ApiResponse<RoomList>> {
    identity.authorize(RoleRequirement::Any)?;

    let rooms = state.store.list_rooms().await?;
    Ok(ApiResponse::success(RoomList { rooms }))
}

/// POST /kamar — admin only.
pub async fn create(
    State(state): State<AppState>,
    identity: Identity,
    ValidatedJson(req): ValidatedJson<CreateRoomRequest>,
) -> Result<CreatedResponse<RoomBody>> {
    identity.authorize(RoleRequirement::Admin)?;

    let room = state
        .store
        .create_room(NewRoom {
            number: req.number,
            room_type: req.room_type,
            monthly_rate: req.monthly_rate,
            amenities: req.amenities,
        })
        .await?;

    Ok(ApiResponse::created(RoomBody { room }))
}

/// PUT /kamar/{id} — admin only.
pub async fn update(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateRoomRequest>,
) -> Result<ApiResponse<RoomBody>> {
    identity.authorize(RoleRequirement::Admin)?;

    let room = state
        .store
        .update_room(
            id,
            RoomUpdate {
                room_type: req.room_type,
                monthly_rate: req.monthly_rate,
                status: req.status,
                amenities: req.amenities,
            },
        )
        .await?;

    Ok(ApiResponse::success(RoomBody { room }))
}
