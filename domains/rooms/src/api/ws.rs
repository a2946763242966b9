//! WebSocket session
//!
//! A socket authenticates either with an `Authorization: Bearer` header on
//! the upgrade request or with an `auth` frame within the handshake timeout.
//! Once authenticated it is registered with the router; a writer task drains
//! the connection's queue and pings the client while this task reads client
//! frames. Any inbound frame, pongs included, counts as activity.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::{IntoResponse, Response},
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::mpsc::{self, WeakUnboundedSender};
use uuid::Uuid;

use crate::api::middleware::RoomsState;
use crate::error::RoomError;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::router::ConnectionId;

type WsSink = SplitSink<WebSocket, WsMessage>;
type WsStream = SplitStream<WebSocket>;

/// Grace period for flushing queued frames after the session ends
const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// `GET /ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<RoomsState>,
    headers: HeaderMap,
) -> Response {
    // A bad header fails the upgrade; a missing one defers to the auth frame
    let preauthenticated = match headers.get(AUTHORIZATION) {
        Some(value) => match duet_auth::extract_bearer_token(value)
            .and_then(|token| state.tokens.verify(&token))
        {
            Ok(user_id) => Some(user_id),
            Err(err) => return err.into_response(),
        },
        None => None,
    };

    ws.on_upgrade(move |socket| run_session(socket, state, preauthenticated))
}

async fn send_event(sink: &mut WsSink, event: &ServerEvent) -> bool {
    let text = match event.to_json() {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
            return false;
        }
    };
    sink.send(WsMessage::Text(text.into())).await.is_ok()
}

/// Wait for a valid `auth` frame. `ping` is answered; anything else ends
/// the socket.
async fn handshake(
    sink: &mut WsSink,
    stream: &mut WsStream,
    state: &RoomsState,
) -> Option<Uuid> {
    let deadline = tokio::time::sleep(state.handshake_timeout);
    tokio::pin!(deadline);

    loop {
        let frame = tokio::select! {
            _ = &mut deadline => {
                tracing::debug!("WebSocket handshake timed out");
                send_event(sink, &ServerEvent::error("UNAUTHENTICATED", "Authentication timed out")).await;
                return None;
            }
            frame = stream.next() => frame,
        };

        let text = match frame {
            Some(Ok(WsMessage::Text(text))) => text,
            Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => continue,
            Some(Ok(WsMessage::Binary(_))) => {
                send_event(sink, &ServerEvent::error("UNAUTHENTICATED", "Authenticate first")).await;
                return None;
            }
            Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => return None,
        };

        match serde_json::from_str::<ClientEvent>(text.as_str()) {
            Ok(ClientEvent::Auth { token }) => match state.tokens.verify(&token) {
                Ok(user_id) => return Some(user_id),
                Err(err) => {
                    send_event(sink, &ServerEvent::error(err.code(), err.message())).await;
                    return None;
                }
            },
            Ok(ClientEvent::Ping) => {
                if !send_event(sink, &ServerEvent::Pong).await {
                    return None;
                }
            }
            _ => {
                send_event(sink, &ServerEvent::error("UNAUTHENTICATED", "Authenticate first")).await;
                return None;
            }
        }
    }
}

/// Queue a frame for the writer. False once the router has dropped the
/// connection.
fn reply(replies: &WeakUnboundedSender<ServerEvent>, event: ServerEvent) -> bool {
    match replies.upgrade() {
        Some(sender) => sender.send(event).is_ok(),
        None => false,
    }
}

async fn handle_event(state: &RoomsState, conn: ConnectionId, event: ClientEvent) -> ServerEvent {
    match event {
        ClientEvent::Auth { .. } => ServerEvent::error("INVALID_INPUT", "Already authenticated"),
        ClientEvent::Ping => ServerEvent::Pong,
        ClientEvent::Join { conversation_id } => {
            match state.router.subscribe(conn, conversation_id).await {
                Ok(_) => ServerEvent::Joined { conversation_id },
                Err(err) => room_error(conn, err),
            }
        }
        ClientEvent::Leave { conversation_id } => {
            match state.router.unsubscribe(conn, conversation_id).await {
                Ok(_) => ServerEvent::Left { conversation_id },
                Err(err) => room_error(conn, err),
            }
        }
    }
}

fn room_error(conn: ConnectionId, err: RoomError) -> ServerEvent {
    if let RoomError::Store(e) = &err {
        tracing::warn!(conn = %conn, error = %e, "Room join failed on store");
    }
    ServerEvent::error(err.code(), err.public_message())
}

async fn run_session(socket: WebSocket, state: RoomsState, preauthenticated: Option<Uuid>) {
    let (mut sink, mut stream) = socket.split();

    let user_id = match preauthenticated {
        Some(user_id) => user_id,
        None => match handshake(&mut sink, &mut stream, &state).await {
            Some(user_id) => user_id,
            None => {
                let _ = sink.close().await;
                return;
            }
        },
    };

    // The router owns the only strong sender, so eviction closes the queue
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let replies = tx.downgrade();
    let conn = state.router.register(user_id, tx).await;
    tracing::info!(conn = %conn, user_id = %user_id, "WebSocket connected");

    let ping_interval = state.ping_interval;
    let mut writer = tokio::spawn(async move {
        let mut pings =
            tokio::time::interval_at(tokio::time::Instant::now() + ping_interval, ping_interval);
        pings.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => {
                        if !send_event(&mut sink, &event).await {
                            break;
                        }
                    }
                    None => break,
                },
                _ = pings.tick() => {
                    if sink.send(WsMessage::Ping(Default::default())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sink.close().await;
    });

    reply(&replies, ServerEvent::AuthOk { user_id });

    let mut writer_done = false;
    loop {
        let frame = tokio::select! {
            _ = &mut writer => {
                writer_done = true;
                break;
            }
            frame = stream.next() => frame,
        };

        let text = match frame {
            Some(Ok(WsMessage::Text(text))) => text,
            Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {
                state.router.touch(conn).await;
                continue;
            }
            Some(Ok(WsMessage::Binary(_))) => {
                state.router.touch(conn).await;
                if !reply(&replies, ServerEvent::error("INVALID_INPUT", "Text frames only")) {
                    break;
                }
                continue;
            }
            Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
        };

        state.router.touch(conn).await;

        let response = match serde_json::from_str::<ClientEvent>(text.as_str()) {
            Ok(event) => handle_event(&state, conn, event).await,
            Err(e) => {
                tracing::debug!(conn = %conn, error = %e, "Unrecognized client frame");
                ServerEvent::error("INVALID_INPUT", "Unrecognized frame")
            }
        };
        if !reply(&replies, response) {
            break;
        }
    }

    state.router.disconnect(conn).await;
    if !writer_done && tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        writer.abort();
    }
    tracing::info!(conn = %conn, user_id = %user_id, "WebSocket disconnected");
}
