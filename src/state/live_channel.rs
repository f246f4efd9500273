use std::collections::HashSet;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::ws::LobbyOutboundMessage,
    services::websocket_service::send_message_to_websocket,
    state::connection::{ConnectionPhase, InvalidTransition, LobbyEvent},
};

#[derive(Clone)]
/// Handle used to push messages to a connected client, plus its lobby phase.
pub struct LiveConnection {
    pub id: Uuid,
    pub tx: mpsc::UnboundedSender<Message>,
    pub phase: ConnectionPhase,
}

/// Registry of live connections and the board rooms they are bound to.
///
/// Owned by the application state. Tests build isolated instances with [`LiveChannel::new`].
#[derive(Default)]
pub struct LiveChannel {
    connections: DashMap<Uuid, LiveConnection>,
    rooms: DashMap<Uuid, HashSet<Uuid>>,
}

impl LiveChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly accepted socket in the `Anonymous` phase.
    pub fn register(&self, connection_id: Uuid, tx: mpsc::UnboundedSender<Message>) {
        self.connections.insert(
            connection_id,
            LiveConnection {
                id: connection_id,
                tx,
                phase: ConnectionPhase::Anonymous,
            },
        );
    }

    /// Forget a connection and drop it from whatever room it was bound to.
    ///
    /// Returns the phase the connection was in before the transport closed.
    pub fn unregister(&self, connection_id: Uuid) -> Option<ConnectionPhase> {
        let (_, connection) = self.connections.remove(&connection_id)?;
        if let Some((board_id, _)) = connection.phase.binding() {
            self.leave_room(board_id, connection_id);
        }
        Some(connection.phase)
    }

    /// Apply a lobby event to a connection's phase atomically.
    ///
    /// Room membership follows the phase: entering a bound phase joins the board room and
    /// leaving it drops the connection from the room. Unknown connections behave as
    /// `Disconnected`.
    pub fn transition(
        &self,
        connection_id: Uuid,
        event: LobbyEvent,
    ) -> Result<ConnectionPhase, InvalidTransition> {
        let Some(mut connection) = self.connections.get_mut(&connection_id) else {
            return Err(InvalidTransition {
                from: ConnectionPhase::Disconnected,
                event,
            });
        };
        let next = connection.phase.next(event)?;
        let previous_board = connection.phase.binding().map(|(board_id, _)| board_id);
        let next_board = next.binding().map(|(board_id, _)| board_id);
        connection.phase = next;

        // Rooms are only ever locked after connections, never the other way round.
        if previous_board != next_board {
            if let Some(board_id) = previous_board {
                self.leave_room(board_id, connection_id);
            }
            if let Some(board_id) = next_board {
                self.join_room(board_id, connection_id);
            }
        }
        Ok(next)
    }

    /// Current phase of a connection, if it is still registered.
    pub fn phase(&self, connection_id: Uuid) -> Option<ConnectionPhase> {
        self.connections
            .get(&connection_id)
            .map(|connection| connection.phase)
    }

    /// Add a connection to a board room.
    pub fn join_room(&self, board_id: Uuid, connection_id: Uuid) {
        self.rooms
            .entry(board_id)
            .or_default()
            .insert(connection_id);
    }

    /// Remove a connection from a board room, dropping the room once empty.
    pub fn leave_room(&self, board_id: Uuid, connection_id: Uuid) {
        if let Some(mut members) = self.rooms.get_mut(&board_id) {
            members.remove(&connection_id);
        }
        self.rooms
            .remove_if(&board_id, |_, members| members.is_empty());
    }

    /// Connections currently bound to a board room.
    pub fn room_members(&self, board_id: Uuid) -> Vec<Uuid> {
        self.rooms
            .get(&board_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Connections whose phase binds them to `player_id`.
    pub fn connections_for_player(&self, player_id: Uuid) -> Vec<Uuid> {
        self.connections
            .iter()
            .filter(|entry| {
                entry
                    .phase
                    .binding()
                    .is_some_and(|(_, bound_player)| bound_player == player_id)
            })
            .map(|entry| entry.id)
            .collect()
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Send a message to a single connection. Returns whether it was queued.
    pub fn send_to(&self, connection_id: Uuid, message: &LobbyOutboundMessage) -> bool {
        let Some(tx) = self
            .connections
            .get(&connection_id)
            .map(|connection| connection.tx.clone())
        else {
            debug!(connection_id = %connection_id, "dropping message for unknown connection");
            return false;
        };

        send_message_to_websocket(&tx, message).is_ok()
    }

    /// Send a message to every connection of a room except `exclude`.
    ///
    /// Delivery is best effort: closed transports are skipped. Returns the number of
    /// connections the message was queued for.
    pub fn broadcast(
        &self,
        board_id: Uuid,
        message: &LobbyOutboundMessage,
        exclude: Option<Uuid>,
    ) -> usize {
        let recipients: Vec<Uuid> = self
            .room_members(board_id)
            .into_iter()
            .filter(|connection_id| exclude != Some(*connection_id))
            .collect();

        let mut delivered = 0;
        for connection_id in recipients {
            if self.send_to(connection_id, message) {
                delivered += 1;
            } else {
                debug!(
                    board_id = %board_id,
                    connection_id = %connection_id,
                    "broadcast skipped closed connection"
                );
            }
        }
        delivered
    }

    /// Close every socket and forget all rooms.
    pub fn shutdown(&self) {
        let count = self.connections.len();
        for entry in self.connections.iter() {
            let _ = entry.tx.send(Message::Close(None));
        }
        self.connections.clear();
        self.rooms.clear();
        info!(connections = count, "live channel shut down");
    }
}
