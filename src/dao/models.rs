use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Game board persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardEntity {
    /// Primary key of the board.
    pub id: Uuid,
    /// Short numeric pin players type to join (unique among active boards).
    pub pin: String,
    /// Display name of the quiz / round.
    pub name: String,
    /// Identifiers of the current members, in join order.
    pub members: Vec<Uuid>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the board entity was updated.
    pub updated_at: SystemTime,
}

impl BoardEntity {
    /// Build a fresh board without any member.
    pub fn new(pin: impl Into<String>, name: impl Into<String>) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            pin: pin.into(),
            name: name.into(),
            members: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `player_id` is currently listed as a member.
    pub fn has_member(&self, player_id: Uuid) -> bool {
        self.members.contains(&player_id)
    }
}

/// Player record persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Board this player was created for.
    pub board_id: Uuid,
    /// Display name, unique within the board.
    pub display_name: String,
    /// Current score.
    pub score: i64,
    /// Open-ended key-value state bag.
    pub state: IndexMap<String, serde_json::Value>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the player entity was updated.
    pub updated_at: SystemTime,
}

impl PlayerEntity {
    /// Build a fresh player with a zero score and an empty state bag.
    pub fn new(board_id: Uuid, display_name: impl Into<String>) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            board_id,
            display_name: display_name.into(),
            score: 0,
            state: IndexMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
