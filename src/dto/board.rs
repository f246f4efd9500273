use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{BoardEntity, PlayerEntity},
    dto::{format_system_time, player::PlayerSummary},
};

/// Payload used by administrators to open a new board.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateBoardRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

/// Board projection including its roster, members listed in join order.
#[derive(Debug, Serialize, ToSchema)]
pub struct BoardSummary {
    pub id: Uuid,
    pub pin: String,
    pub name: String,
    pub created_at: String,
    pub players: Vec<PlayerSummary>,
}

impl From<(BoardEntity, Vec<PlayerEntity>)> for BoardSummary {
    fn from((board, players): (BoardEntity, Vec<PlayerEntity>)) -> Self {
        Self {
            id: board.id,
            pin: board.pin,
            name: board.name,
            created_at: format_system_time(board.created_at),
            players: players.into_iter().map(PlayerSummary::from).collect(),
        }
    }
}
