use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Keyed mutual exclusion: one async mutex per board identifier.
///
/// Entries are created on demand and dropped again once no caller holds or waits on them.
#[derive(Default)]
pub struct BoardLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Guard returned by [`BoardLocks::lock`]; releases the board when dropped.
pub struct BoardGuard<'a> {
    board_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    owner: &'a BoardLocks,
}

impl BoardLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other task holds the lock for `board_id`, then take it.
    pub async fn lock(&self, board_id: Uuid) -> BoardGuard<'_> {
        let mutex = self
            .locks
            .entry(board_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        BoardGuard {
            board_id,
            guard: Some(guard),
            owner: self,
        }
    }

    /// Number of boards that currently have a lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for BoardGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex before checking whether anyone else still references it.
        self.guard.take();
        self.owner
            .locks
            .remove_if(&self.board_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
