pub mod board_locks;
pub mod connection;
pub mod live_channel;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{config::AppConfig, dao::session_store::SessionStore, error::ServiceError};

pub use self::board_locks::{BoardGuard, BoardLocks};
pub use self::live_channel::{LiveChannel, LiveConnection};

pub type SharedState = Arc<AppState>;

/// Central application state storing live connections, board locks and the storage handle.
pub struct AppState {
    session_store: RwLock<Option<Arc<dyn SessionStore>>>,
    live: LiveChannel,
    board_locks: BoardLocks,
    degraded: watch::Sender<bool>,
    config: Arc<AppConfig>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            session_store: RwLock::new(None),
            live: LiveChannel::new(),
            board_locks: BoardLocks::new(),
            degraded: degraded_tx,
            config: Arc::new(config),
        })
    }

    /// Obtain a handle to the current session store, if one is installed.
    pub async fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        let guard = self.session_store.read().await;
        guard.as_ref().cloned()
    }

    /// Session store to run an operation against, or [`ServiceError::Degraded`].
    pub async fn require_session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.session_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new session store implementation and leave degraded mode.
    pub async fn set_session_store(&self, store: Arc<dyn SessionStore>) {
        {
            let mut guard = self.session_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current session store and enter degraded mode.
    pub async fn clear_session_store(&self) {
        {
            let mut guard = self.session_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub(crate) fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Registry of live connections and board rooms.
    pub fn live(&self) -> &LiveChannel {
        &self.live
    }

    /// Per-board lock map serializing membership mutations.
    pub fn board_locks(&self) -> &BoardLocks {
        &self.board_locks
    }

    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }
}

#[cfg(test)]
pub mod test_helpers {
    use std::sync::Arc;

    use dashmap::DashMap;
    use futures::future::BoxFuture;
    use thiserror::Error;
    use uuid::Uuid;

    use super::{AppState, SharedState};
    use crate::{
        config::AppConfig,
        dao::{
            models::{BoardEntity, PlayerEntity},
            session_store::{MemorySessionStore, SessionStore},
            storage::{StorageError, StorageResult},
        },
    };

    /// Build a state backed by a fresh in-memory store with default configuration.
    pub async fn test_state() -> (SharedState, MemorySessionStore) {
        test_state_with(AppConfig::default()).await
    }

    /// Build a state backed by a fresh in-memory store.
    pub async fn test_state_with(config: AppConfig) -> (SharedState, MemorySessionStore) {
        let store = MemorySessionStore::new();
        let state = AppState::new(config);
        state.set_session_store(Arc::new(store.clone())).await;
        (state, store)
    }

    /// Insert an empty board with the given pin.
    pub async fn seed_board(store: &dyn SessionStore, pin: &str) -> BoardEntity {
        let board = BoardEntity::new(pin, "Friday quiz");
        store.create_board(board.clone()).await.unwrap();
        board
    }

    /// Store operations that can be made to fail on demand.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum FailingOp {
        FindBoardByPin,
        FindBoardById,
        SaveBoard,
        /// The board write is applied but the call still reports a failure.
        SaveBoardUnacknowledged,
        CreatePlayer,
        DeletePlayer,
    }

    #[derive(Debug, Error)]
    #[error("injected failure")]
    struct InjectedFailure;

    /// Wrapper around [`MemorySessionStore`] that fails selected operations a set number of times.
    #[derive(Clone, Default)]
    pub struct FlakyStore {
        inner: MemorySessionStore,
        failures: Arc<DashMap<FailingOp, u32>>,
    }

    impl FlakyStore {
        pub fn new(inner: MemorySessionStore) -> Self {
            Self {
                inner,
                failures: Arc::default(),
            }
        }

        /// Make the next `times` calls of `op` fail with [`StorageError::Unavailable`].
        pub fn fail_next(&self, op: FailingOp, times: u32) {
            self.failures.insert(op, times);
        }

        /// Remaining injected failures for `op`.
        pub fn pending_failures(&self, op: FailingOp) -> u32 {
            self.failures.get(&op).map(|count| *count).unwrap_or(0)
        }

        fn take_failure(&self, op: FailingOp) -> bool {
            match self.failures.get_mut(&op) {
                Some(mut remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        }

        fn injected<T: Send + 'static>(op: FailingOp) -> BoxFuture<'static, StorageResult<T>> {
            Box::pin(async move {
                Err(StorageError::unavailable(
                    format!("{op:?} failed"),
                    InjectedFailure,
                ))
            })
        }
    }

    impl SessionStore for FlakyStore {
        fn find_board_by_pin(
            &self,
            pin: String,
        ) -> BoxFuture<'static, StorageResult<Option<BoardEntity>>> {
            if self.take_failure(FailingOp::FindBoardByPin) {
                return Self::injected(FailingOp::FindBoardByPin);
            }
            self.inner.find_board_by_pin(pin)
        }

        fn find_board_by_id(
            &self,
            id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<BoardEntity>>> {
            if self.take_failure(FailingOp::FindBoardById) {
                return Self::injected(FailingOp::FindBoardById);
            }
            self.inner.find_board_by_id(id)
        }

        fn create_board(&self, board: BoardEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.create_board(board)
        }

        fn save_board(&self, board: BoardEntity) -> BoxFuture<'static, StorageResult<()>> {
            if self.take_failure(FailingOp::SaveBoard) {
                return Self::injected(FailingOp::SaveBoard);
            }
            if self.take_failure(FailingOp::SaveBoardUnacknowledged) {
                let write = self.inner.save_board(board);
                return Box::pin(async move {
                    write.await?;
                    Self::injected::<()>(FailingOp::SaveBoardUnacknowledged).await
                });
            }
            self.inner.save_board(board)
        }

        fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
            if self.take_failure(FailingOp::CreatePlayer) {
                return Self::injected(FailingOp::CreatePlayer);
            }
            self.inner.create_player(player)
        }

        fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
            self.inner.find_player(id)
        }

        fn find_players(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
            self.inner.find_players(ids)
        }

        fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.save_player(player)
        }

        fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            if self.take_failure(FailingOp::DeletePlayer) {
                return Self::injected(FailingOp::DeletePlayer);
            }
            self.inner.delete_player(id)
        }

        fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
            self.inner.list_players()
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    /// Build a state backed by a [`FlakyStore`] around a fresh in-memory store.
    pub async fn flaky_state(config: AppConfig) -> (SharedState, FlakyStore, MemorySessionStore) {
        let memory = MemorySessionStore::new();
        let flaky = FlakyStore::new(memory.clone());
        let state = AppState::new(config);
        state.set_session_store(Arc::new(flaky.clone())).await;
        (state, flaky, memory)
    }
}
