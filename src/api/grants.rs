use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::{AppError, Result};
use crate::models::RoomGrant;
use crate::state::AppState;

/// Room grant routes
pub fn grant_routes() -> Router<AppState> {
    Router::new().route("/{room_id}/grant", post(issue_grant))
}

/// POST /api/v1/rooms/:room_id/grant - Mint a grant for a matched room.
///
/// The engine authorizes first: only the two participants of an
/// unexpired match record get a token, everyone else is refused.
async fn issue_grant(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Path(room_id): Path<String>,
) -> Result<Json<RoomGrant>> {
    Uuid::parse_str(&room_id)
        .map_err(|_| AppError::BadRequest("Invalid room ID format".to_string()))?;

    state.matchmaker.authorize_grant(&identity, &room_id)?;

    let grant = state.grants.issue(&identity, &room_id)?;

    tracing::info!(room_id = %room_id, identity = %identity, "Room grant issued");

    Ok(Json(grant))
}
