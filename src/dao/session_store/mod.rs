/// In-process backend used for development and tests.
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{BoardEntity, PlayerEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use memory::MemorySessionStore;

/// Abstraction over the persistence layer for boards and players.
///
/// Every method is a single atomic operation on one document (or a read-only query);
/// callers must not assume any multi-document transaction.
pub trait SessionStore: Send + Sync {
    fn find_board_by_pin(&self, pin: String) -> BoxFuture<'static, StorageResult<Option<BoardEntity>>>;
    fn find_board_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<BoardEntity>>>;
    /// Insert a new board, failing with [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict)
    /// when its pin is already taken.
    fn create_board(&self, board: BoardEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn save_board(&self, board: BoardEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Fetch the players matching `ids`; unknown identifiers are skipped.
    fn find_players(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Overwrite an existing player, returning whether a record matched. Never inserts.
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete a player, returning whether a record was removed.
    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
