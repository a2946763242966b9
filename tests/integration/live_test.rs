//! Live channel end-to-end tests over a real socket

#![allow(dead_code)]

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderValue};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, Message},
    MaybeTlsStream, WebSocketStream,
};

use common::{TestApp, TestUser};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(3);

async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    socket
}

async fn connect_with_header(addr: SocketAddr, token: &str) -> Socket {
    let mut request = format!("ws://{}/ws", addr).into_client_request().unwrap();
    request.headers_mut().insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    let (socket, _) = connect_async(request).await.unwrap();
    socket
}

async fn send(socket: &mut Socket, frame: Value) {
    socket
        .send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

/// Next JSON text frame
async fn next_event(socket: &mut Socket) -> Value {
    loop {
        let frame = tokio::time::timeout(WAIT, socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket ended")
            .expect("socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// The server closes the socket
async fn expect_closed(socket: &mut Socket) {
    loop {
        let frame = tokio::time::timeout(WAIT, socket.next())
            .await
            .expect("socket stayed open");
        match frame {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(_)) => continue,
        }
    }
}

async fn authenticated(addr: SocketAddr, user: &TestUser) -> Socket {
    let mut socket = connect(addr).await;
    send(&mut socket, json!({"event": "auth", "token": user.token})).await;
    let ok = next_event(&mut socket).await;
    assert_eq!(ok, json!({"event": "auth:ok", "userId": user.id}));
    socket
}

async fn join(socket: &mut Socket, conversation_id: uuid::Uuid) {
    send(
        socket,
        json!({"event": "room:join", "conversationId": conversation_id}),
    )
    .await;
    let joined = next_event(socket).await;
    assert_eq!(
        joined,
        json!({"event": "room:joined", "conversationId": conversation_id})
    );
}

#[test_log::test(tokio::test)]
async fn test_message_reaches_both_participants() {
    let app = TestApp::new();
    let ada = app.create_user("Ada").await;
    let bob = app.create_user("Bob").await;
    let id = app.open_conversation(&ada, &bob).await;
    let addr = app.serve().await.unwrap();

    let mut ada_socket = authenticated(addr, &ada).await;
    let mut bob_socket = authenticated(addr, &bob).await;
    join(&mut ada_socket, id).await;
    join(&mut bob_socket, id).await;

    let sent = app.send_message(&ada, id, "over the wire").await;

    for socket in [&mut ada_socket, &mut bob_socket] {
        let event = next_event(socket).await;
        assert_eq!(event["event"], "message:new");
        assert_eq!(event["message"]["id"], sent["id"]);
        assert_eq!(event["message"]["content"], "over the wire");
    }
}

#[test_log::test(tokio::test)]
async fn test_upgrade_header_authenticates() {
    let app = TestApp::new();
    let ada = app.create_user("Ada").await;
    let addr = app.serve().await.unwrap();

    let mut socket = connect_with_header(addr, &ada.token).await;
    let ok = next_event(&mut socket).await;
    assert_eq!(ok["event"], "auth:ok");

    send(&mut socket, json!({"event": "ping"})).await;
    assert_eq!(next_event(&mut socket).await, json!({"event": "pong"}));
}

#[test_log::test(tokio::test)]
async fn test_bad_upgrade_header_is_refused() {
    let app = TestApp::new();
    let addr = app.serve().await.unwrap();

    let mut request = format!("ws://{}/ws", addr).into_client_request().unwrap();
    request
        .headers_mut()
        .insert(AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
    assert!(connect_async(request).await.is_err());
}

#[test_log::test(tokio::test)]
async fn test_frame_before_auth_closes_socket() {
    let app = TestApp::new();
    let addr = app.serve().await.unwrap();

    let mut socket = connect(addr).await;
    send(
        &mut socket,
        json!({"event": "room:join", "conversationId": uuid::Uuid::new_v4()}),
    )
    .await;

    let err = next_event(&mut socket).await;
    assert_eq!(err["event"], "error");
    assert_eq!(err["code"], "UNAUTHENTICATED");
    expect_closed(&mut socket).await;
}

#[test_log::test(tokio::test)]
async fn test_ping_allowed_before_auth() {
    let app = TestApp::new();
    let ada = app.create_user("Ada").await;
    let addr = app.serve().await.unwrap();

    let mut socket = connect(addr).await;
    send(&mut socket, json!({"event": "ping"})).await;
    assert_eq!(next_event(&mut socket).await, json!({"event": "pong"}));

    send(&mut socket, json!({"event": "auth", "token": ada.token})).await;
    assert_eq!(next_event(&mut socket).await["event"], "auth:ok");
}

#[test_log::test(tokio::test)]
async fn test_invalid_token_frame_closes_socket() {
    let app = TestApp::new();
    let addr = app.serve().await.unwrap();

    let mut socket = connect(addr).await;
    send(&mut socket, json!({"event": "auth", "token": "forged"})).await;

    let err = next_event(&mut socket).await;
    assert_eq!(err["code"], "INVALID_TOKEN");
    expect_closed(&mut socket).await;
}

#[test_log::test(tokio::test)]
async fn test_silent_handshake_times_out() {
    let app = TestApp::new();
    let addr = app.serve().await.unwrap();

    let mut socket = connect(addr).await;
    let err = next_event(&mut socket).await;
    assert_eq!(err["code"], "UNAUTHENTICATED");
    expect_closed(&mut socket).await;
}

#[test_log::test(tokio::test)]
async fn test_outsider_join_is_refused_but_socket_survives() {
    let app = TestApp::new();
    let ada = app.create_user("Ada").await;
    let bob = app.create_user("Bob").await;
    let eve = app.create_user("Eve").await;
    let id = app.open_conversation(&ada, &bob).await;
    let addr = app.serve().await.unwrap();

    let mut socket = authenticated(addr, &eve).await;
    send(&mut socket, json!({"event": "room:join", "conversationId": id})).await;
    let err = next_event(&mut socket).await;
    assert_eq!(err["code"], "FORBIDDEN");

    send(&mut socket, json!({"event": "ping"})).await;
    assert_eq!(next_event(&mut socket).await, json!({"event": "pong"}));
}

#[test_log::test(tokio::test)]
async fn test_leave_stops_delivery_and_close_unregisters() {
    let app = TestApp::new();
    let ada = app.create_user("Ada").await;
    let bob = app.create_user("Bob").await;
    let id = app.open_conversation(&ada, &bob).await;
    let addr = app.serve().await.unwrap();

    let mut socket = authenticated(addr, &bob).await;
    join(&mut socket, id).await;
    assert_eq!(app.rooms.stats().await.rooms, 1);

    send(&mut socket, json!({"event": "room:leave", "conversationId": id})).await;
    assert_eq!(
        next_event(&mut socket).await,
        json!({"event": "room:left", "conversationId": id})
    );
    assert_eq!(app.rooms.stats().await.rooms, 0);

    app.send_message(&ada, id, "nobody listening").await;
    send(&mut socket, json!({"event": "ping"})).await;
    // The pong arrives with no message:new ahead of it
    assert_eq!(next_event(&mut socket).await, json!({"event": "pong"}));

    socket.close(None).await.unwrap();
    let mut remaining = app.rooms.stats().await.connections;
    for _ in 0..50 {
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        remaining = app.rooms.stats().await.connections;
    }
    assert_eq!(remaining, 0);
}

#[test_log::test(tokio::test)]
async fn test_idle_connection_is_evicted() {
    let app = TestApp::new();
    let ada = app.create_user("Ada").await;
    let addr = app.serve().await.unwrap();
    let sweeper = duet_rooms::spawn_sweeper(
        app.rooms.clone(),
        Duration::from_millis(100),
        Duration::from_millis(300),
    );

    let mut socket = authenticated(addr, &ada).await;
    expect_closed(&mut socket).await;
    assert_eq!(app.rooms.stats().await.connections, 0);

    sweeper.abort();
}

#[test_log::test(tokio::test)]
async fn test_listening_client_answering_pings_stays_subscribed() {
    let app = TestApp::with_config(common::test_config(&[("HEARTBEAT_INTERVAL_SECS", "1")]));
    let ada = app.create_user("Ada").await;
    let bob = app.create_user("Bob").await;
    let id = app.open_conversation(&ada, &bob).await;
    let addr = app.serve().await.unwrap();
    let sweeper = duet_rooms::spawn_sweeper(
        app.rooms.clone(),
        Duration::from_millis(100),
        Duration::from_millis(1500),
    );

    let mut socket = authenticated(addr, &bob).await;
    join(&mut socket, id).await;

    // Only read, never send: the client library answers server pings
    let deadline = tokio::time::Instant::now() + Duration::from_millis(3500);
    let mut pings = 0;
    while let Ok(frame) = tokio::time::timeout_at(deadline, socket.next()).await {
        match frame {
            Some(Ok(Message::Ping(_))) => pings += 1,
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => panic!("socket was closed"),
            Some(Ok(other)) => panic!("unexpected frame: {:?}", other),
        }
    }
    assert!(pings >= 2, "saw {} pings", pings);
    assert_eq!(app.rooms.stats().await.connections, 1);

    let sent = app.send_message(&ada, id, "still here?").await;
    let event = next_event(&mut socket).await;
    assert_eq!(event["event"], "message:new");
    assert_eq!(event["message"]["id"], sent["id"]);

    sweeper.abort();
}
