use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{models::PlayerEntity, session_store::SessionStore},
    dto::player::{PlayerSummary, ScoreUpdateRequest},
    error::ServiceError,
    state::SharedState,
};

/// Retrieve a single player.
pub async fn get_player(state: &SharedState, player_id: Uuid) -> Result<PlayerSummary, ServiceError> {
    let store = state.require_session_store().await?;
    find_existing(store.as_ref(), player_id)
        .await
        .map(PlayerSummary::from)
}

/// Overwrite a player's score. Single-document write, no broadcast.
///
/// Runs under the player's board lock and never recreates a player removed in the meantime.
pub async fn update_score(
    state: &SharedState,
    player_id: Uuid,
    request: ScoreUpdateRequest,
) -> Result<PlayerSummary, ServiceError> {
    let store = state.require_session_store().await?;
    let board_id = find_existing(store.as_ref(), player_id).await?.board_id;

    let _guard = state.board_locks().lock(board_id).await;
    let mut player = find_existing(store.as_ref(), player_id).await?;
    player.score = request.score;
    player.updated_at = SystemTime::now();
    if !store.save_player(player.clone()).await? {
        return Err(player_not_found(player_id));
    }

    info!(player_id = %player_id, score = player.score, "player score updated");
    Ok(PlayerSummary::from(player))
}

async fn find_existing(
    store: &dyn SessionStore,
    player_id: Uuid,
) -> Result<PlayerEntity, ServiceError> {
    store
        .find_player(player_id)
        .await?
        .ok_or_else(|| player_not_found(player_id))
}

fn player_not_found(player_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("player `{player_id}` not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{services::membership, state::test_helpers};

    #[tokio::test]
    async fn score_update_is_persisted() {
        let (state, store) = test_helpers::test_state().await;
        test_helpers::seed_board(&store, "4821").await;
        let ada = membership::join(&state, "4821", "Ada").await.unwrap();

        let updated = update_score(&state, ada.player_id, ScoreUpdateRequest { score: 1200 })
            .await
            .unwrap();
        assert_eq!(updated.score, 1200);

        let fetched = get_player(&state, ada.player_id).await.unwrap();
        assert_eq!(fetched.score, 1200);
        assert_eq!(fetched.display_name, "Ada");
    }

    #[tokio::test]
    async fn score_update_racing_leave_does_not_resurrect_player() {
        let (state, store) = test_helpers::test_state().await;
        let board = test_helpers::seed_board(&store, "4821").await;
        let ada = membership::join(&state, "4821", "Ada").await.unwrap();

        let (left, updated) = tokio::join!(
            membership::leave(&state, board.id, ada.player_id),
            async {
                tokio::task::yield_now().await;
                tokio::task::yield_now().await;
                update_score(&state, ada.player_id, ScoreUpdateRequest { score: 7 }).await
            }
        );

        left.unwrap();
        if let Err(err) = updated {
            assert!(matches!(err, ServiceError::NotFound(_)));
        }
        assert!(store.find_player(ada.player_id).await.unwrap().is_none());
        let stored = store.find_board_by_id(board.id).await.unwrap().unwrap();
        assert!(stored.members.is_empty());
        assert!(state.board_locks().is_empty());
    }

    #[tokio::test]
    async fn score_update_of_removed_player_is_not_found() {
        let (state, store) = test_helpers::test_state().await;
        let board = test_helpers::seed_board(&store, "4821").await;
        let ada = membership::join(&state, "4821", "Ada").await.unwrap();
        membership::remove_inactive(&state, board.id, ada.player_id)
            .await
            .unwrap();

        assert!(matches!(
            update_score(&state, ada.player_id, ScoreUpdateRequest { score: 7 }).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(store.find_player(ada.player_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_player_is_not_found() {
        let (state, _store) = test_helpers::test_state().await;
        assert!(matches!(
            get_player(&state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
