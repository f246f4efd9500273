use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("board pin `{pin}` already in use")]
    DuplicatePin { pin: String },
    #[error("failed to save board `{id}`")]
    SaveBoard {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load board `{key}`")]
    LoadBoard {
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save player `{id}`")]
    SavePlayer {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load players")]
    LoadPlayers {
        #[source]
        source: MongoError,
    },
    #[error("failed to delete player `{id}`")]
    DeletePlayer {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("stored document `{id}` holds an invalid identifier")]
    CorruptDocument {
        id: String,
        #[source]
        source: uuid::Error,
    },
}
