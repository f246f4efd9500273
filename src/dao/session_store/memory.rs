use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use tokio::task::yield_now;
use uuid::Uuid;

use crate::dao::{
    models::{BoardEntity, PlayerEntity},
    session_store::SessionStore,
    storage::{StorageError, StorageResult},
};

/// Session store keeping every document in process memory.
///
/// Each operation yields to the scheduler before touching the maps so concurrent units of
/// work interleave between their reads and writes the same way they do against a remote
/// database.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    boards: DashMap<Uuid, BoardEntity>,
    pins: DashMap<String, Uuid>,
    players: DashMap<Uuid, PlayerEntity>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryInner {
    fn create_board(&self, board: BoardEntity) -> StorageResult<()> {
        match self.pins.entry(board.pin.clone()) {
            Entry::Occupied(_) => Err(StorageError::conflict(format!(
                "board pin `{}` already in use",
                board.pin
            ))),
            Entry::Vacant(slot) => {
                slot.insert(board.id);
                self.boards.insert(board.id, board);
                Ok(())
            }
        }
    }

    fn find_board_by_pin(&self, pin: &str) -> Option<BoardEntity> {
        let id = *self.pins.get(pin)?;
        self.boards.get(&id).map(|board| board.clone())
    }

    fn find_players(&self, ids: &[Uuid]) -> Vec<PlayerEntity> {
        ids.iter()
            .filter_map(|id| self.players.get(id).map(|player| player.clone()))
            .collect()
    }
}

impl SessionStore for MemorySessionStore {
    fn find_board_by_pin(&self, pin: String) -> BoxFuture<'static, StorageResult<Option<BoardEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            yield_now().await;
            Ok(inner.find_board_by_pin(&pin))
        })
    }

    fn find_board_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<BoardEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            yield_now().await;
            Ok(inner.boards.get(&id).map(|board| board.clone()))
        })
    }

    fn create_board(&self, board: BoardEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            yield_now().await;
            inner.create_board(board)
        })
    }

    fn save_board(&self, board: BoardEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            yield_now().await;
            inner.pins.entry(board.pin.clone()).or_insert(board.id);
            inner.boards.insert(board.id, board);
            Ok(())
        })
    }

    fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            yield_now().await;
            match inner.players.entry(player.id) {
                Entry::Occupied(_) => Err(StorageError::conflict(format!(
                    "player `{}` already exists",
                    player.id
                ))),
                Entry::Vacant(slot) => {
                    slot.insert(player);
                    Ok(())
                }
            }
        })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            yield_now().await;
            Ok(inner.players.get(&id).map(|player| player.clone()))
        })
    }

    fn find_players(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            yield_now().await;
            Ok(inner.find_players(&ids))
        })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            yield_now().await;
            match inner.players.get_mut(&player.id) {
                Some(mut existing) => {
                    *existing = player;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            yield_now().await;
            Ok(inner.players.remove(&id).is_some())
        })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            yield_now().await;
            Ok(inner
                .players
                .iter()
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_board_rejects_duplicate_pin() {
        let store = MemorySessionStore::new();
        store
            .create_board(BoardEntity::new("4821", "first"))
            .await
            .unwrap();

        let err = store
            .create_board(BoardEntity::new("4821", "second"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
    }

    #[tokio::test]
    async fn find_board_by_pin_sees_saved_members() {
        let store = MemorySessionStore::new();
        let mut board = BoardEntity::new("1234", "quiz night");
        store.create_board(board.clone()).await.unwrap();

        let player = PlayerEntity::new(board.id, "Ada");
        board.members.push(player.id);
        store.save_board(board.clone()).await.unwrap();

        let found = store
            .find_board_by_pin("1234".into())
            .await
            .unwrap()
            .expect("board should exist");
        assert_eq!(found.members, vec![player.id]);
        assert!(store.find_board_by_pin("9999".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_players_keeps_requested_order_and_skips_unknown() {
        let store = MemorySessionStore::new();
        let board_id = Uuid::new_v4();
        let ada = PlayerEntity::new(board_id, "Ada");
        let bob = PlayerEntity::new(board_id, "Bob");
        store.create_player(ada.clone()).await.unwrap();
        store.create_player(bob.clone()).await.unwrap();

        let players = store
            .find_players(vec![bob.id, Uuid::new_v4(), ada.id])
            .await
            .unwrap();
        let names: Vec<_> = players.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, ["Bob", "Ada"]);
    }

    #[tokio::test]
    async fn delete_player_reports_whether_record_existed() {
        let store = MemorySessionStore::new();
        let player = PlayerEntity::new(Uuid::new_v4(), "Ada");
        store.create_player(player.clone()).await.unwrap();

        assert!(store.delete_player(player.id).await.unwrap());
        assert!(!store.delete_player(player.id).await.unwrap());
        assert!(store.find_player(player.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_player_never_recreates_deleted_player() {
        let store = MemorySessionStore::new();
        let mut player = PlayerEntity::new(Uuid::new_v4(), "Ada");
        store.create_player(player.clone()).await.unwrap();

        player.score = 300;
        assert!(store.save_player(player.clone()).await.unwrap());
        assert_eq!(store.find_player(player.id).await.unwrap().unwrap().score, 300);

        store.delete_player(player.id).await.unwrap();
        assert!(!store.save_player(player.clone()).await.unwrap());
        assert!(store.find_player(player.id).await.unwrap().is_none());
    }
}
