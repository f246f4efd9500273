use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
/// Messages accepted from lobby WebSocket clients.
#[serde(tag = "type")]
pub enum LobbyInboundMessage {
    /// Attempt to join the board identified by `pin`.
    #[serde(rename = "joinRequest", rename_all = "camelCase")]
    JoinRequest { pin: String, display_name: String },
    /// Voluntarily leave the board this connection joined.
    #[serde(rename = "leaveRequest", rename_all = "camelCase")]
    LeaveRequest { board_id: Uuid, player_id: Uuid },
    /// Re-attach a fresh connection to a membership created earlier.
    #[serde(rename = "resumeRequest", rename_all = "camelCase")]
    ResumeRequest { board_id: Uuid, player_id: Uuid },
    #[serde(other)]
    Unknown,
}

impl LobbyInboundMessage {
    /// Parse a text frame sent by a client.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Machine-readable failure reason reported to the requesting connection.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
pub enum ErrorReason {
    InvalidPin,
    NameTaken,
    InvalidName,
    BoardNotFound,
    PlayerNotInBoard,
    StoreUnavailable,
    InvalidState,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
/// Messages pushed to lobby WebSocket clients.
///
/// Acknowledgements and errors are addressed to the requesting connection only; the
/// `player*` events are broadcast to the board room.
#[serde(tag = "type")]
pub enum LobbyOutboundMessage {
    #[serde(rename = "joined", rename_all = "camelCase")]
    Joined { board_id: Uuid, player_id: Uuid },
    #[serde(rename = "joinError")]
    JoinError { reason: ErrorReason, message: String },
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "leaveError")]
    LeaveError { reason: ErrorReason, message: String },
    #[serde(rename = "resumed", rename_all = "camelCase")]
    Resumed { board_id: Uuid, player_id: Uuid },
    #[serde(rename = "resumeError")]
    ResumeError { reason: ErrorReason, message: String },
    #[serde(rename = "playerAdded", rename_all = "camelCase")]
    PlayerAdded { player_id: Uuid, display_name: String },
    #[serde(rename = "playerRemoved", rename_all = "camelCase")]
    PlayerRemoved { player_id: Uuid },
    /// A player was removed by an administrator rather than by its own connection.
    #[serde(rename = "playerEvicted", rename_all = "camelCase")]
    PlayerEvicted { player_id: Uuid },
    /// Frame could not be understood.
    #[serde(rename = "error")]
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_join_request_with_camel_case_fields() {
        let msg = LobbyInboundMessage::from_json_str(
            r#"{"type":"joinRequest","pin":"4821","displayName":"Ada"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            LobbyInboundMessage::JoinRequest {
                pin: "4821".into(),
                display_name: "Ada".into(),
            }
        );
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let msg = LobbyInboundMessage::from_json_str(r#"{"type":"sendAction"}"#).unwrap();
        assert_eq!(msg, LobbyInboundMessage::Unknown);
    }

    #[test]
    fn leave_request_requires_uuids() {
        assert!(
            LobbyInboundMessage::from_json_str(
                r#"{"type":"leaveRequest","boardId":"nope","playerId":"nope"}"#
            )
            .is_err()
        );
    }

    #[test]
    fn outbound_events_use_wire_names() {
        let player_id = Uuid::new_v4();
        let added = serde_json::to_value(LobbyOutboundMessage::PlayerAdded {
            player_id,
            display_name: "Ada".into(),
        })
        .unwrap();
        assert_eq!(
            added,
            json!({"type": "playerAdded", "playerId": player_id, "displayName": "Ada"})
        );

        let left = serde_json::to_value(LobbyOutboundMessage::Left).unwrap();
        assert_eq!(left, json!({"type": "left"}));

        let error = serde_json::to_value(LobbyOutboundMessage::JoinError {
            reason: ErrorReason::NameTaken,
            message: "taken".into(),
        })
        .unwrap();
        assert_eq!(
            error,
            json!({"type": "joinError", "reason": "NameTaken", "message": "taken"})
        );
    }
}
