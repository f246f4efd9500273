//! Business logic powering the admin REST routes.

use uuid::Uuid;

use crate::{
    dto::admin::{ActionResponse, SweepResponse},
    error::ServiceError,
    services::{lobby_service, membership},
    state::SharedState,
};

/// Remove an inactive player and tell its board room.
pub async fn evict_player(
    state: &SharedState,
    board_id: Uuid,
    player_id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    lobby_service::remove_inactive(state, board_id, player_id).await?;
    Ok(ActionResponse {
        message: format!("player `{player_id}` removed from board `{board_id}`"),
    })
}

/// Delete player records that no board lists anymore.
pub async fn sweep_players(state: &SharedState) -> Result<SweepResponse, ServiceError> {
    let removed = membership::sweep_orphans(state).await?;
    Ok(SweepResponse { removed })
}
