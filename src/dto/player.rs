use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{dao::models::PlayerEntity, dto::format_system_time};

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Public projection of a player exposed to REST clients.
pub struct PlayerSummary {
    pub id: Uuid,
    pub board_id: Uuid,
    pub display_name: String,
    pub score: i64,
    #[schema(value_type = Object)]
    pub state: IndexMap<String, serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(player: PlayerEntity) -> Self {
        Self {
            id: player.id,
            board_id: player.board_id,
            display_name: player.display_name,
            score: player.score,
            state: player.state,
            created_at: format_system_time(player.created_at),
            updated_at: format_system_time(player.updated_at),
        }
    }
}

/// Request to overwrite a player's score.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ScoreUpdateRequest {
    #[validate(range(min = -1_000_000, max = 1_000_000))]
    pub score: i64,
}
