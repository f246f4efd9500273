use std::future::Future;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ErrorReason, LobbyInboundMessage, LobbyOutboundMessage},
    error::ServiceError,
    services::membership,
    state::{AppState, SharedState, connection::LobbyEvent},
};

/// Dispatch a parsed lobby request coming from `connection_id`.
pub async fn handle_message(
    state: &SharedState,
    connection_id: Uuid,
    message: LobbyInboundMessage,
) {
    match message {
        LobbyInboundMessage::JoinRequest { pin, display_name } => {
            handle_join(state, connection_id, &pin, &display_name).await
        }
        LobbyInboundMessage::LeaveRequest {
            board_id,
            player_id,
        } => handle_leave(state, connection_id, board_id, player_id).await,
        LobbyInboundMessage::ResumeRequest {
            board_id,
            player_id,
        } => handle_resume(state, connection_id, board_id, player_id).await,
        LobbyInboundMessage::Unknown => {
            debug!(connection_id = %connection_id, "ignoring unsupported lobby message");
            reply(
                state,
                connection_id,
                LobbyOutboundMessage::Error {
                    message: "unsupported message type".into(),
                },
            );
        }
    }
}

/// `Anonymous -> Joining -> Joined | Anonymous`.
pub async fn handle_join(
    state: &SharedState,
    connection_id: Uuid,
    pin: &str,
    display_name: &str,
) {
    if let Err(err) = state
        .live()
        .transition(connection_id, LobbyEvent::JoinRequested)
    {
        reply(
            state,
            connection_id,
            LobbyOutboundMessage::JoinError {
                reason: ErrorReason::InvalidState,
                message: err.to_string(),
            },
        );
        return;
    }

    match with_retry(state, "join", || membership::join(state, pin, display_name)).await {
        Ok(outcome) => {
            let bound = state.live().transition(
                connection_id,
                LobbyEvent::JoinSucceeded {
                    board_id: outcome.board_id,
                    player_id: outcome.player_id,
                },
            );
            if let Err(err) = bound {
                debug!(
                    connection_id = %connection_id,
                    error = %err,
                    "connection went away before it could be bound"
                );
            }

            reply(
                state,
                connection_id,
                LobbyOutboundMessage::Joined {
                    board_id: outcome.board_id,
                    player_id: outcome.player_id,
                },
            );
            state.live().broadcast(
                outcome.board_id,
                &LobbyOutboundMessage::PlayerAdded {
                    player_id: outcome.player_id,
                    display_name: outcome.display_name,
                },
                Some(connection_id),
            );
        }
        Err(err) => {
            let _ = state
                .live()
                .transition(connection_id, LobbyEvent::JoinFailed);
            info!(connection_id = %connection_id, pin, error = %err, "join rejected");
            reply(
                state,
                connection_id,
                LobbyOutboundMessage::JoinError {
                    reason: err.reason(),
                    message: err.to_string(),
                },
            );
        }
    }
}

/// `Joined -> Leaving -> Anonymous | Joined`.
pub async fn handle_leave(
    state: &SharedState,
    connection_id: Uuid,
    board_id: Uuid,
    player_id: Uuid,
) {
    if let Err(err) = state.live().transition(
        connection_id,
        LobbyEvent::LeaveRequested {
            board_id,
            player_id,
        },
    ) {
        reply(
            state,
            connection_id,
            LobbyOutboundMessage::LeaveError {
                reason: ErrorReason::InvalidState,
                message: err.to_string(),
            },
        );
        return;
    }

    match with_retry(state, "leave", || {
        membership::leave(state, board_id, player_id)
    })
    .await
    {
        Ok(()) => {
            // Unbind before notifying the rest of the room.
            let _ = state
                .live()
                .transition(connection_id, LobbyEvent::LeaveSucceeded);
            reply(state, connection_id, LobbyOutboundMessage::Left);
            state.live().broadcast(
                board_id,
                &LobbyOutboundMessage::PlayerRemoved { player_id },
                Some(connection_id),
            );
        }
        Err(err) => {
            let _ = state
                .live()
                .transition(connection_id, LobbyEvent::LeaveFailed);
            info!(
                connection_id = %connection_id,
                board_id = %board_id,
                player_id = %player_id,
                error = %err,
                "leave rejected"
            );
            reply(
                state,
                connection_id,
                LobbyOutboundMessage::LeaveError {
                    reason: err.reason(),
                    message: err.to_string(),
                },
            );
        }
    }
}

/// Re-attach an `Anonymous` connection to a membership that still exists. Nothing is broadcast.
pub async fn handle_resume(
    state: &SharedState,
    connection_id: Uuid,
    board_id: Uuid,
    player_id: Uuid,
) {
    let outcome = match with_retry(state, "resume", || {
        membership::verify_membership(state, board_id, player_id)
    })
    .await
    {
        Ok(()) => state
            .live()
            .transition(
                connection_id,
                LobbyEvent::Resumed {
                    board_id,
                    player_id,
                },
            )
            .map_err(ServiceError::from),
        Err(err) => Err(err),
    };

    match outcome {
        Ok(_) => {
            info!(
                connection_id = %connection_id,
                board_id = %board_id,
                player_id = %player_id,
                "connection resumed membership"
            );
            reply(
                state,
                connection_id,
                LobbyOutboundMessage::Resumed {
                    board_id,
                    player_id,
                },
            );
        }
        Err(err) => reply(
            state,
            connection_id,
            LobbyOutboundMessage::ResumeError {
                reason: err.reason(),
                message: err.to_string(),
            },
        ),
    }
}

/// Administrative removal: store mutation, then `playerEvicted` to the whole room, then every
/// connection bound to the player is reset to `Anonymous`.
pub async fn remove_inactive(
    state: &SharedState,
    board_id: Uuid,
    player_id: Uuid,
) -> Result<(), ServiceError> {
    with_retry(state, "remove_inactive", || {
        membership::remove_inactive(state, board_id, player_id)
    })
    .await?;

    let notified = state.live().broadcast(
        board_id,
        &LobbyOutboundMessage::PlayerEvicted { player_id },
        None,
    );
    for connection_id in state.live().connections_for_player(player_id) {
        if let Err(err) = state.live().transition(connection_id, LobbyEvent::Evicted) {
            debug!(connection_id = %connection_id, error = %err, "evicted connection already unbound");
        }
    }

    info!(board_id = %board_id, player_id = %player_id, notified, "player evicted");
    Ok(())
}

/// Forget a closed connection. The membership it held is kept; only `removeInactive` ends it.
pub fn handle_disconnect(state: &SharedState, connection_id: Uuid) {
    match state.live().unregister(connection_id) {
        Some(phase) => match phase.binding() {
            Some((board_id, player_id)) => info!(
                connection_id = %connection_id,
                board_id = %board_id,
                player_id = %player_id,
                "bound connection disconnected; membership kept"
            ),
            None => debug!(connection_id = %connection_id, ?phase, "connection disconnected"),
        },
        None => debug!(connection_id = %connection_id, "connection already unregistered"),
    }
}

/// Run `operation`, retrying immediately while the store reports a backend failure.
async fn with_retry<T, F, Fut>(
    state: &AppState,
    operation: &'static str,
    mut run: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let max_retries = state.config().store_retry_attempts();
    let mut attempt = 0;
    loop {
        match run().await {
            Err(err) if err.is_retryable() && attempt < max_retries => {
                attempt += 1;
                warn!(operation, attempt, error = %err, "store unavailable; retrying");
            }
            result => return result,
        }
    }
}

fn reply(state: &AppState, connection_id: Uuid, message: LobbyOutboundMessage) {
    if !state.live().send_to(connection_id, &message) {
        debug!(connection_id = %connection_id, "reply dropped; connection closed");
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::session_store::SessionStore,
        state::{
            connection::ConnectionPhase,
            test_helpers::{self, FailingOp},
        },
    };

    fn connect(state: &SharedState) -> (Uuid, mpsc::UnboundedReceiver<Message>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.live().register(id, tx);
        (id, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<LobbyOutboundMessage> {
        let mut events = Vec::new();
        while let Ok(message) = rx.try_recv() {
            match message {
                Message::Text(text) => events.push(serde_json::from_str(text.as_str()).unwrap()),
                other => panic!("expected text frame, got {other:?}"),
            }
        }
        events
    }

    async fn joined(
        state: &SharedState,
        pin: &str,
        name: &str,
    ) -> (Uuid, Uuid, mpsc::UnboundedReceiver<Message>) {
        let (connection_id, mut rx) = connect(state);
        handle_join(state, connection_id, pin, name).await;
        match drain(&mut rx).as_slice() {
            [LobbyOutboundMessage::Joined { player_id, .. }] => (connection_id, *player_id, rx),
            other => panic!("expected joined, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn join_notifies_everyone_in_the_room_except_the_joiner() {
        let (state, store) = test_helpers::test_state().await;
        let board = test_helpers::seed_board(&store, "4821").await;
        let (_, _, mut rx_ada) = joined(&state, "4821", "Ada").await;
        let (_, _, mut rx_grace) = joined(&state, "4821", "Grace").await;
        drain(&mut rx_ada);

        let (lin, mut rx_lin) = connect(&state);
        handle_join(&state, lin, "4821", "Lin").await;

        let lin_events = drain(&mut rx_lin);
        assert!(matches!(
            lin_events.as_slice(),
            [LobbyOutboundMessage::Joined { board_id, .. }] if *board_id == board.id
        ));
        let LobbyOutboundMessage::Joined { player_id, .. } = lin_events[0].clone() else {
            unreachable!();
        };
        let expected = LobbyOutboundMessage::PlayerAdded {
            player_id,
            display_name: "Lin".into(),
        };
        assert_eq!(drain(&mut rx_ada), vec![expected.clone()]);
        assert_eq!(drain(&mut rx_grace), vec![expected]);
        assert_eq!(state.live().room_members(board.id).len(), 3);
    }

    #[tokio::test]
    async fn join_error_goes_to_the_requester_only() {
        let (state, store) = test_helpers::test_state().await;
        test_helpers::seed_board(&store, "4821").await;
        let (_, _, mut rx_ada) = joined(&state, "4821", "Ada").await;

        let (other, mut rx_other) = connect(&state);
        handle_join(&state, other, "4821", "Ada").await;

        assert!(matches!(
            drain(&mut rx_other).as_slice(),
            [LobbyOutboundMessage::JoinError {
                reason: ErrorReason::NameTaken,
                ..
            }]
        ));
        assert!(drain(&mut rx_ada).is_empty());
        assert_eq!(state.live().phase(other), Some(ConnectionPhase::Anonymous));
    }

    #[tokio::test]
    async fn leave_unbinds_then_notifies_remaining_members() {
        let (state, store) = test_helpers::test_state().await;
        let board = test_helpers::seed_board(&store, "4821").await;
        let (ada_conn, ada_id, mut rx_ada) = joined(&state, "4821", "Ada").await;
        let (_, grace_id, mut rx_grace) = joined(&state, "4821", "Grace").await;
        drain(&mut rx_ada);

        handle_leave(&state, ada_conn, board.id, ada_id).await;

        assert_eq!(drain(&mut rx_ada), vec![LobbyOutboundMessage::Left]);
        assert_eq!(
            drain(&mut rx_grace),
            vec![LobbyOutboundMessage::PlayerRemoved { player_id: ada_id }]
        );
        assert_eq!(state.live().phase(ada_conn), Some(ConnectionPhase::Anonymous));
        let stored = store.find_board_by_id(board.id).await.unwrap().unwrap();
        assert_eq!(stored.members, vec![grace_id]);
    }

    #[tokio::test]
    async fn out_of_phase_requests_get_invalid_state() {
        let (state, store) = test_helpers::test_state().await;
        let board = test_helpers::seed_board(&store, "4821").await;
        let (ada_conn, _, mut rx_ada) = joined(&state, "4821", "Ada").await;
        let (_, grace_id, _rx_grace) = joined(&state, "4821", "Grace").await;
        drain(&mut rx_ada);

        handle_join(&state, ada_conn, "4821", "Ada2").await;
        handle_leave(&state, ada_conn, board.id, grace_id).await;

        let events = drain(&mut rx_ada);
        assert!(matches!(
            events.as_slice(),
            [
                LobbyOutboundMessage::JoinError {
                    reason: ErrorReason::InvalidState,
                    ..
                },
                LobbyOutboundMessage::LeaveError {
                    reason: ErrorReason::InvalidState,
                    ..
                },
            ]
        ));
        assert!(matches!(
            state.live().phase(ada_conn),
            Some(ConnectionPhase::Joined { .. })
        ));
        let stored = store.find_board_by_id(board.id).await.unwrap().unwrap();
        assert_eq!(stored.members.len(), 2);

        let (anonymous, mut rx_anonymous) = connect(&state);
        handle_leave(&state, anonymous, board.id, grace_id).await;
        assert!(matches!(
            drain(&mut rx_anonymous).as_slice(),
            [LobbyOutboundMessage::LeaveError {
                reason: ErrorReason::InvalidState,
                ..
            }]
        ));
    }

    #[tokio::test]
    async fn remove_inactive_evicts_and_resets_bound_connections() {
        let (state, store) = test_helpers::test_state().await;
        let board = test_helpers::seed_board(&store, "4821").await;
        let (ada_conn, ada_id, mut rx_ada) = joined(&state, "4821", "Ada").await;
        let (_, _, mut rx_grace) = joined(&state, "4821", "Grace").await;
        drain(&mut rx_ada);

        remove_inactive(&state, board.id, ada_id).await.unwrap();

        let evicted = LobbyOutboundMessage::PlayerEvicted { player_id: ada_id };
        assert_eq!(drain(&mut rx_ada), vec![evicted.clone()]);
        assert_eq!(drain(&mut rx_grace), vec![evicted]);
        assert_eq!(state.live().phase(ada_conn), Some(ConnectionPhase::Anonymous));
        assert!(!state.live().room_members(board.id).contains(&ada_conn));
        assert!(store.find_player(ada_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_membership_change_broadcasts_nothing() {
        let (state, store) = test_helpers::test_state().await;
        let board = test_helpers::seed_board(&store, "4821").await;
        let (_, _, mut rx_ada) = joined(&state, "4821", "Ada").await;

        assert!(matches!(
            remove_inactive(&state, board.id, Uuid::new_v4()).await,
            Err(ServiceError::PlayerNotInBoard { .. })
        ));
        assert!(drain(&mut rx_ada).is_empty());
    }

    #[tokio::test]
    async fn backend_failure_is_retried_once() {
        let (state, flaky, memory) = test_helpers::flaky_state(AppConfig::default()).await;
        test_helpers::seed_board(&memory, "4821").await;

        flaky.fail_next(FailingOp::FindBoardByPin, 1);
        let (ada, mut rx_ada) = connect(&state);
        handle_join(&state, ada, "4821", "Ada").await;
        assert!(matches!(
            drain(&mut rx_ada).as_slice(),
            [LobbyOutboundMessage::Joined { .. }]
        ));

        flaky.fail_next(FailingOp::FindBoardByPin, 2);
        let (grace, mut rx_grace) = connect(&state);
        handle_join(&state, grace, "4821", "Grace").await;
        assert!(matches!(
            drain(&mut rx_grace).as_slice(),
            [LobbyOutboundMessage::JoinError {
                reason: ErrorReason::StoreUnavailable,
                ..
            }]
        ));
        assert_eq!(state.live().phase(grace), Some(ConnectionPhase::Anonymous));
    }

    #[tokio::test]
    async fn resume_reports_missing_board_after_absorbing_backend_failure() {
        let config = AppConfig::default().with_store_retry_attempts(3);
        let (state, flaky, _memory) = test_helpers::flaky_state(config).await;
        flaky.fail_next(FailingOp::FindBoardById, 1);

        let (conn, mut rx) = connect(&state);
        handle_resume(&state, conn, Uuid::new_v4(), Uuid::new_v4()).await;

        assert!(matches!(
            drain(&mut rx).as_slice(),
            [LobbyOutboundMessage::ResumeError {
                reason: ErrorReason::BoardNotFound,
                ..
            }]
        ));
        assert_eq!(flaky.pending_failures(FailingOp::FindBoardById), 0);
    }

    #[tokio::test]
    async fn disconnect_keeps_membership_and_resume_rebinds_silently() {
        let (state, store) = test_helpers::test_state().await;
        let board = test_helpers::seed_board(&store, "4821").await;
        let (ada_conn, ada_id, _rx_ada) = joined(&state, "4821", "Ada").await;
        let (_, _, mut rx_grace) = joined(&state, "4821", "Grace").await;

        handle_disconnect(&state, ada_conn);
        let stored = store.find_board_by_id(board.id).await.unwrap().unwrap();
        assert!(stored.has_member(ada_id));
        assert!(!state.live().room_members(board.id).contains(&ada_conn));

        let (fresh, mut rx_fresh) = connect(&state);
        handle_resume(&state, fresh, board.id, ada_id).await;

        assert_eq!(
            drain(&mut rx_fresh),
            vec![LobbyOutboundMessage::Resumed {
                board_id: board.id,
                player_id: ada_id,
            }]
        );
        assert!(drain(&mut rx_grace).is_empty());
        assert!(state.live().room_members(board.id).contains(&fresh));
    }

    #[tokio::test]
    async fn unknown_message_gets_error_reply() {
        let (state, _store) = test_helpers::test_state().await;
        let (conn, mut rx) = connect(&state);

        handle_message(&state, conn, LobbyInboundMessage::Unknown).await;

        assert!(matches!(
            drain(&mut rx).as_slice(),
            [LobbyOutboundMessage::Error { .. }]
        ));
    }
}
