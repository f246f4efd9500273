use std::time::SystemTime;

use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::ValidationError;

use crate::{
    config::JoinSerialization,
    dao::{models::PlayerEntity, session_store::SessionStore},
    dto::validation::{validate_display_name, validate_pin},
    error::ServiceError,
    state::{AppState, BoardGuard},
};

/// Identifiers handed back to a player after a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub board_id: Uuid,
    pub player_id: Uuid,
    pub display_name: String,
}

/// Add a new player named `display_name` to the board identified by `pin`.
///
/// Under the per-board policy the board is re-read and the uniqueness check and both writes
/// happen while holding the board lock. If the board write fails after the player was created
/// the board is read back: a write that landed anyway counts as a successful join, otherwise
/// the player is deleted again. Players that cannot be confirmed or deleted are left for
/// [`sweep_orphans`].
pub async fn join(
    state: &AppState,
    pin: &str,
    display_name: &str,
) -> Result<JoinOutcome, ServiceError> {
    validate_pin(pin).map_err(|_| ServiceError::InvalidPin(pin.to_string()))?;
    let config = state.config();
    validate_display_name(
        display_name,
        config.display_name_max_len(),
        config.blocked_names(),
    )
    .map_err(|err| ServiceError::InvalidName(validation_message(&err)))?;

    let store = state.require_session_store().await?;
    let board = store
        .find_board_by_pin(pin.to_string())
        .await?
        .ok_or_else(|| ServiceError::InvalidPin(pin.to_string()))?;

    let guard = lock_board(state, board.id).await;
    let mut board = if guard.is_some() {
        // The board may have been deleted since the pin lookup.
        store
            .find_board_by_id(board.id)
            .await?
            .ok_or_else(|| ServiceError::InvalidPin(pin.to_string()))?
    } else {
        board
    };

    let members = store.find_players(board.members.clone()).await?;
    if members
        .iter()
        .any(|member| member.display_name == display_name)
    {
        return Err(ServiceError::NameTaken(display_name.to_string()));
    }

    let player = PlayerEntity::new(board.id, display_name);
    let player_id = player.id;
    store.create_player(player).await?;

    board.members.push(player_id);
    board.updated_at = SystemTime::now();
    let board_id = board.id;
    if let Err(err) = store.save_board(board).await {
        warn!(
            board_id = %board_id,
            player_id = %player_id,
            error = %err,
            "failed to persist board after creating player; checking whether the write landed"
        );
        settle_failed_board_write(store.as_ref(), board_id, player_id, err.into()).await?;
    }
    drop(guard);

    info!(board_id = %board_id, player_id = %player_id, display_name, "player joined board");
    Ok(JoinOutcome {
        board_id,
        player_id,
        display_name: display_name.to_string(),
    })
}

/// Remove a player that asked to leave its board.
pub async fn leave(state: &AppState, board_id: Uuid, player_id: Uuid) -> Result<(), ServiceError> {
    remove_member(state, board_id, player_id).await?;
    info!(board_id = %board_id, player_id = %player_id, "player left board");
    Ok(())
}

/// Remove a player on behalf of an administrator. Same contract as [`leave`].
pub async fn remove_inactive(
    state: &AppState,
    board_id: Uuid,
    player_id: Uuid,
) -> Result<(), ServiceError> {
    remove_member(state, board_id, player_id).await?;
    info!(board_id = %board_id, player_id = %player_id, "inactive player removed from board");
    Ok(())
}

/// Check that `player_id` is still listed on `board_id` without modifying anything.
pub async fn verify_membership(
    state: &AppState,
    board_id: Uuid,
    player_id: Uuid,
) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;
    let board = store
        .find_board_by_id(board_id)
        .await?
        .ok_or(ServiceError::BoardNotFound(board_id))?;

    if board.has_member(player_id) {
        Ok(())
    } else {
        Err(ServiceError::PlayerNotInBoard {
            board_id,
            player_id,
        })
    }
}

/// Delete every player whose board is gone or no longer lists it.
///
/// Each candidate is re-checked while holding its board's lock. Returns the number of deleted
/// players.
pub async fn sweep_orphans(state: &AppState) -> Result<usize, ServiceError> {
    let store = state.require_session_store().await?;
    let players = store.list_players().await?;

    let mut removed = 0;
    for player in players {
        let _guard = lock_board(state, player.board_id).await;
        let listed = store
            .find_board_by_id(player.board_id)
            .await?
            .is_some_and(|board| board.has_member(player.id));
        if listed {
            continue;
        }

        if store.delete_player(player.id).await? {
            debug!(
                board_id = %player.board_id,
                player_id = %player.id,
                "deleted orphaned player"
            );
            removed += 1;
        }
    }

    info!(removed, "orphaned player sweep finished");
    Ok(removed)
}

/// Persist the membership removal first, then delete the player record.
async fn remove_member(
    state: &AppState,
    board_id: Uuid,
    player_id: Uuid,
) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;
    let _guard = lock_board(state, board_id).await;

    let mut board = store
        .find_board_by_id(board_id)
        .await?
        .ok_or(ServiceError::BoardNotFound(board_id))?;

    let Some(position) = board.members.iter().position(|id| *id == player_id) else {
        return Err(ServiceError::PlayerNotInBoard {
            board_id,
            player_id,
        });
    };
    board.members.remove(position);
    board.updated_at = SystemTime::now();
    store.save_board(board).await?;

    match store.delete_player(player_id).await {
        Ok(true) => {}
        Ok(false) => debug!(player_id = %player_id, "player record already gone"),
        Err(err) => warn!(
            board_id = %board_id,
            player_id = %player_id,
            error = %err,
            "membership removed but player record could not be deleted; leaving it for the sweep"
        ),
    }

    Ok(())
}

/// Decide the fate of a freshly created player after its board write reported `err`.
///
/// A player is only deleted once the board is known not to list it, so the board never keeps a
/// reference to a missing player.
async fn settle_failed_board_write(
    store: &dyn SessionStore,
    board_id: Uuid,
    player_id: Uuid,
    err: ServiceError,
) -> Result<(), ServiceError> {
    match store.find_board_by_id(board_id).await {
        Ok(Some(board)) if board.has_member(player_id) => {
            info!(
                board_id = %board_id,
                player_id = %player_id,
                "board write landed despite the reported error; keeping player"
            );
            Ok(())
        }
        Ok(_) => {
            if let Err(cleanup_err) = store.delete_player(player_id).await {
                warn!(
                    player_id = %player_id,
                    error = %cleanup_err,
                    "failed to delete player during rollback; leaving it for the sweep"
                );
            }
            Err(err)
        }
        Err(read_err) => {
            warn!(
                board_id = %board_id,
                player_id = %player_id,
                error = %read_err,
                "could not confirm board write; leaving player for the sweep"
            );
            Err(err)
        }
    }
}

/// Take the board lock when the configured policy asks for it.
async fn lock_board(state: &AppState, board_id: Uuid) -> Option<BoardGuard<'_>> {
    match state.config().serialization() {
        JoinSerialization::PerBoard => Some(state.board_locks().lock(board_id).await),
        JoinSerialization::Unserialized => None,
    }
}

fn validation_message(err: &ValidationError) -> String {
    err.message
        .as_ref()
        .map(|message| message.to_string())
        .unwrap_or_else(|| err.code.to_string())
}
