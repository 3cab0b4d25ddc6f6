//! Manages the WebSocket connection lifecycle for one realtime client.

use super::{
    gateway::RoomEvent,
    protocol::{ClientCommand, ServerMessage},
};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use lyceum_core::{SimulationError, model::Channel};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, instrument, warn};

/// Upgrades a connection on the supervised channel.
pub async fn supervised_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, Channel::Supervised))
}

/// Upgrades a connection on the unsupervised channel.
pub async fn unsupervised_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, Channel::Unsupervised))
}

/// Main handler for an individual WebSocket connection.
///
/// Forwards the joined room's bus events to the socket and answers client
/// commands until either side closes.
#[instrument(name = "ws_session", skip_all, fields(%channel, room))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, channel: Channel) {
    let (mut socket_tx, mut socket_rx) = socket.split();
    let mut events = state.gateway.subscribe();
    let mut room: Option<String> = None;
    info!("Realtime client connected");

    if send_msg(
        &mut socket_tx,
        ServerMessage::Connected {
            channel: channel.to_string(),
        },
    )
    .await
    .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket_rx.next() => {
                let Some(incoming) = incoming else { break };
                match incoming {
                    Ok(Message::Text(text)) => {
                        let reply = match serde_json::from_str::<ClientCommand>(&text) {
                            Ok(command) => handle_command(&state, channel, &mut room, command).await,
                            Err(e) => ServerMessage::Error {
                                message: format!("Unrecognized command: {e}"),
                            },
                        };
                        tracing::Span::current().record("room", room.as_deref().unwrap_or(""));
                        if send_msg(&mut socket_tx, reply).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Client sent close frame.");
                        break;
                    }
                    Ok(Message::Binary(_)) => warn!("Ignoring binary frame from realtime client."),
                    Ok(Message::Ping(_) | Message::Pong(_)) => {}
                    Err(e) => {
                        error!("Error receiving from client WebSocket: {:?}", e);
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if !event.is_for(channel, room.as_deref()) {
                            continue;
                        }
                        if forward_event(&mut socket_tx, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Realtime client lagged; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!("Realtime client disconnected");
}

/// Applies one client command and returns the reply.
pub(crate) async fn handle_command(
    state: &AppState,
    channel: Channel,
    room: &mut Option<String>,
    command: ClientCommand,
) -> ServerMessage {
    match command {
        ClientCommand::Ping => ServerMessage::Pong,
        ClientCommand::Subscribe { session_id } => {
            match state
                .service
                .store()
                .read(&session_id, |session| session.channel)
                .await
            {
                Ok(session_channel) if session_channel == channel => {
                    state.gateway.register_session(&session_id, session_channel);
                    debug!(%session_id, "Joined room");
                    *room = Some(session_id.clone());
                    ServerMessage::Subscribed { session_id }
                }
                Ok(session_channel) => ServerMessage::Error {
                    message: format!(
                        "session '{session_id}' runs on the {session_channel} channel"
                    ),
                },
                Err(e) => error_message(e),
            }
        }
        ClientCommand::Unsubscribe { session_id } => {
            if room.as_deref() == Some(session_id.as_str()) {
                *room = None;
            }
            ServerMessage::Unsubscribed { session_id }
        }
        ClientCommand::SupervisorWhisper {
            session_id,
            hint_text,
        } => {
            if channel != Channel::Supervised {
                return ServerMessage::Error {
                    message: "whispers are only accepted on the supervised channel".to_string(),
                };
            }
            match state
                .service
                .submit_supervisor_hint(&session_id, &hint_text)
                .await
            {
                Ok(receipt) => ServerMessage::HintQueued {
                    session_id,
                    queued: receipt.queued,
                },
                Err(e) => error_message(e),
            }
        }
    }
}

fn error_message(err: SimulationError) -> ServerMessage {
    if let SimulationError::Internal(_) = &err {
        error!(error = %err, "Realtime command failed");
    }
    ServerMessage::Error {
        message: err.to_string(),
    }
}

async fn forward_event(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    event: &RoomEvent,
) -> Result<()> {
    socket_tx
        .send(Message::Text(event.frame.to_string().into()))
        .await?;
    Ok(())
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
