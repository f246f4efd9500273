use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{LobbyInboundMessage, LobbyOutboundMessage},
    services::lobby_service,
    state::SharedState,
};

/// The writer task for a connection has stopped; nothing more can be sent to it.
#[derive(Debug, Error)]
#[error("connection closed")]
pub struct ConnectionClosed;

/// Handle the full lifecycle for an individual lobby WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sender.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4();
    state.live().register(connection_id, outbound_tx.clone());
    info!(connection_id = %connection_id, "lobby connection opened");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                match LobbyInboundMessage::from_json_str(&text) {
                    Ok(inbound) => {
                        lobby_service::handle_message(&state, connection_id, inbound).await
                    }
                    Err(err) => {
                        warn!(connection_id = %connection_id, error = %err, "failed to parse lobby message");
                        let reply = LobbyOutboundMessage::Error {
                            message: format!("invalid message: {err}"),
                        };
                        if send_message_to_websocket(&outbound_tx, &reply).is_err() {
                            break;
                        }
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(connection_id = %connection_id, "lobby client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection_id = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    lobby_service::handle_disconnect(&state, connection_id);
    info!(connection_id = %connection_id, "lobby connection closed");

    finalize(writer_task, outbound_tx).await;
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Returns `Ok(())` if the message was queued or if serialization failed (permanent error,
/// no point retrying). Returns `Err(ConnectionClosed)` if the writer channel is closed.
pub fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), ConnectionClosed>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}` (permanent error, not retrying)");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
