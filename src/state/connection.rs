use thiserror::Error;
use uuid::Uuid;

/// Lobby phase of a single live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Connected but not bound to any board; a join may be attempted.
    Anonymous,
    /// A join request is being processed.
    Joining,
    /// Bound to a board room as the given player.
    Joined {
        /// Board whose room the connection belongs to.
        board_id: Uuid,
        /// Player identity owned by the connection.
        player_id: Uuid,
    },
    /// A leave request for the bound player is being processed.
    Leaving {
        /// Board the player is leaving.
        board_id: Uuid,
        /// Player being removed.
        player_id: Uuid,
    },
    /// Transport closed. Terminal.
    Disconnected,
}

impl ConnectionPhase {
    /// Board and player the connection is bound to, if any.
    pub fn binding(&self) -> Option<(Uuid, Uuid)> {
        match self {
            ConnectionPhase::Joined {
                board_id,
                player_id,
            }
            | ConnectionPhase::Leaving {
                board_id,
                player_id,
            } => Some((*board_id, *player_id)),
            _ => None,
        }
    }

    /// Compute the phase reached by applying `event`, leaving `self` untouched.
    pub fn next(&self, event: LobbyEvent) -> Result<ConnectionPhase, InvalidTransition> {
        let next = match (*self, event) {
            (ConnectionPhase::Anonymous, LobbyEvent::JoinRequested) => ConnectionPhase::Joining,
            (
                ConnectionPhase::Joining,
                LobbyEvent::JoinSucceeded {
                    board_id,
                    player_id,
                },
            ) => ConnectionPhase::Joined {
                board_id,
                player_id,
            },
            (ConnectionPhase::Joining, LobbyEvent::JoinFailed) => ConnectionPhase::Anonymous,
            (
                ConnectionPhase::Joined {
                    board_id,
                    player_id,
                },
                LobbyEvent::LeaveRequested {
                    board_id: requested_board,
                    player_id: requested_player,
                },
            ) if board_id == requested_board && player_id == requested_player => {
                ConnectionPhase::Leaving {
                    board_id,
                    player_id,
                }
            }
            (ConnectionPhase::Leaving { .. }, LobbyEvent::LeaveSucceeded) => {
                ConnectionPhase::Anonymous
            }
            (
                ConnectionPhase::Leaving {
                    board_id,
                    player_id,
                },
                LobbyEvent::LeaveFailed,
            ) => ConnectionPhase::Joined {
                board_id,
                player_id,
            },
            (
                ConnectionPhase::Anonymous,
                LobbyEvent::Resumed {
                    board_id,
                    player_id,
                },
            ) => ConnectionPhase::Joined {
                board_id,
                player_id,
            },
            (ConnectionPhase::Joined { .. } | ConnectionPhase::Leaving { .. }, LobbyEvent::Evicted) => {
                ConnectionPhase::Anonymous
            }
            (from, LobbyEvent::TransportClosed) if from != ConnectionPhase::Disconnected => {
                ConnectionPhase::Disconnected
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

/// Events driving a connection through its lobby phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyEvent {
    /// Client sent a join request.
    JoinRequested,
    /// Membership accepted the join.
    JoinSucceeded {
        /// Board the player joined.
        board_id: Uuid,
        /// Freshly created player.
        player_id: Uuid,
    },
    /// Membership rejected the join.
    JoinFailed,
    /// Client asked to remove the given identity from its board.
    LeaveRequested {
        /// Board named in the request.
        board_id: Uuid,
        /// Player named in the request.
        player_id: Uuid,
    },
    /// Membership applied the leave.
    LeaveSucceeded,
    /// Membership rejected the leave.
    LeaveFailed,
    /// Client re-attached to an existing membership.
    Resumed {
        /// Board the player belongs to.
        board_id: Uuid,
        /// Player re-attached to the connection.
        player_id: Uuid,
    },
    /// The bound player was removed by an administrator.
    Evicted,
    /// The underlying socket went away.
    TransportClosed,
}

/// Error returned when an event does not fit the connection's current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{event:?} is not allowed while {from:?}")]
pub struct InvalidTransition {
    /// Phase the connection was in.
    pub from: ConnectionPhase,
    /// Rejected event.
    pub event: LobbyEvent,
}
