use indexmap::IndexMap;
use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{BoardEntity, PlayerEntity};

/// Board document; identifiers are stored as hyphenated strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoBoardDocument {
    #[serde(rename = "_id")]
    id: String,
    pin: String,
    name: String,
    members: Vec<String>,
    created_at: DateTime,
    updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    id: String,
    board_id: String,
    display_name: String,
    score: i64,
    #[serde(default)]
    state: IndexMap<String, serde_json::Value>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<BoardEntity> for MongoBoardDocument {
    fn from(value: BoardEntity) -> Self {
        Self {
            id: value.id.to_string(),
            pin: value.pin,
            name: value.name,
            members: value.members.iter().map(Uuid::to_string).collect(),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoBoardDocument> for BoardEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoBoardDocument) -> MongoResult<Self> {
        let members = value
            .members
            .iter()
            .map(|member| parse_id(member))
            .collect::<MongoResult<Vec<_>>>()?;

        Ok(Self {
            id: parse_id(&value.id)?,
            pin: value.pin,
            name: value.name,
            members,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

impl From<PlayerEntity> for MongoPlayerDocument {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id.to_string(),
            board_id: value.board_id.to_string(),
            display_name: value.display_name,
            score: value.score,
            state: value.state,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoPlayerDocument> for PlayerEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoPlayerDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(&value.id)?,
            board_id: parse_id(&value.board_id)?,
            display_name: value.display_name,
            score: value.score,
            state: value.state,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

fn parse_id(raw: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(raw).map_err(|source| MongoDaoError::CorruptDocument {
        id: raw.to_owned(),
        source,
    })
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}
