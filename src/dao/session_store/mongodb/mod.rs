mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::{ConnectBackoff, MongoConfig};
pub use error::MongoDaoError;
pub use store::MongoSessionStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::DuplicatePin { pin } => {
                StorageError::conflict(format!("board pin `{pin}` already in use"))
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
