//! End-to-end chat tests over a real WebSocket.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use wad_server::config::AppState;
use wad_server::models::ChatMessage;

mod common;
use common::{test_state, wait_until};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = wad_server::router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Connect and wait until the server has registered the connection
async fn connect(addr: SocketAddr, state: &AppState) -> Client {
    let before = state.registry.len();
    let (ws, _) = connect_async(format!("ws://{}/chat/ws", addr))
        .await
        .unwrap();
    let registry = state.registry.clone();
    wait_until("connection registration", || {
        let registry = registry.clone();
        async move { registry.len() > before }
    })
    .await;
    ws
}

async fn next_event(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send_message(ws: &mut Client, user_name: &str, message: &str) {
    let frame = json!({
        "event": "message",
        "data": { "user_name": user_name, "message": message }
    });
    ws.send(Message::text(frame.to_string())).await.unwrap();
}

fn update(user_name: &str, message: &str) -> Value {
    json!({ "event": "update", "data": { "user_name": user_name, "message": message } })
}

async fn stored(state: &AppState) -> Vec<ChatMessage> {
    state.history.read_all().await.unwrap()
}

async fn wait_for_history_len(state: &AppState, len: usize) {
    let history = state.history.clone();
    wait_until("history to settle", || {
        let history = history.clone();
        async move { history.read_all().await.unwrap().len() == len }
    })
    .await;
}

#[tokio::test]
async fn test_message_is_broadcast_and_answered() {
    let (_dir, state) = test_state().await;
    let addr = spawn_server(state.clone()).await;

    let mut alice = connect(addr, &state).await;
    let mut watcher = connect(addr, &state).await;

    send_message(&mut alice, "alice", "hi").await;

    assert_eq!(next_event(&mut watcher).await, update("alice", "hi"));
    assert_eq!(next_event(&mut alice).await, update("alice", "hi"));
    assert_eq!(
        next_event(&mut alice).await,
        json!({ "event": "message", "data": "OK" })
    );

    wait_for_history_len(&state, 2).await;
    assert_eq!(
        stored(&state).await,
        vec![
            ChatMessage::new("alice", "hi"),
            ChatMessage::new("Bot", "OK")
        ]
    );
}

#[tokio::test]
async fn test_late_joiner_gets_replay_before_live_traffic() {
    let (_dir, state) = test_state().await;
    let addr = spawn_server(state.clone()).await;

    let mut alice = connect(addr, &state).await;
    send_message(&mut alice, "alice", "hi").await;
    next_event(&mut alice).await;
    next_event(&mut alice).await;
    wait_for_history_len(&state, 2).await;

    let mut bob = connect(addr, &state).await;
    send_message(&mut alice, "alice", "second").await;

    assert_eq!(next_event(&mut bob).await, update("alice", "hi"));
    assert_eq!(next_event(&mut bob).await, update("Bot", "OK"));
    assert_eq!(next_event(&mut bob).await, update("alice", "second"));

    // Alice was not replayed anything on Bob's behalf
    assert_eq!(next_event(&mut alice).await, update("alice", "second"));
}

#[tokio::test]
async fn test_clear_history_empties_replay() {
    let (_dir, state) = test_state().await;
    let addr = spawn_server(state.clone()).await;

    let mut alice = connect(addr, &state).await;
    send_message(&mut alice, "alice", "hi").await;
    next_event(&mut alice).await;
    next_event(&mut alice).await;
    wait_for_history_len(&state, 2).await;

    let mut bob = connect(addr, &state).await;
    next_event(&mut bob).await;
    next_event(&mut bob).await;

    bob.send(Message::text(r#"{"event":"clear history"}"#.to_string()))
        .await
        .unwrap();
    wait_for_history_len(&state, 0).await;

    let mut carol = connect(addr, &state).await;
    send_message(&mut alice, "alice", "after clear").await;

    // Nothing replayed to Carol and no clear event pushed to anyone
    assert_eq!(next_event(&mut carol).await, update("alice", "after clear"));
    assert_eq!(next_event(&mut bob).await, update("alice", "after clear"));
    assert_eq!(next_event(&mut alice).await, update("alice", "after clear"));
}

#[tokio::test]
async fn test_disconnect_and_protocol_error_unregister() {
    let (_dir, state) = test_state().await;
    let addr = spawn_server(state.clone()).await;

    let mut alice = connect(addr, &state).await;
    let mut bob = connect(addr, &state).await;
    assert_eq!(state.registry.len(), 2);

    alice.close(None).await.unwrap();
    bob.send(Message::text("this is not json".to_string())).await.unwrap();

    let registry = state.registry.clone();
    wait_until("both connections to unregister", || {
        let registry = registry.clone();
        async move { registry.is_empty() }
    })
    .await;
}

#[tokio::test]
async fn test_peer_leaving_does_not_affect_others() {
    let (_dir, state) = test_state().await;
    let addr = spawn_server(state.clone()).await;

    let mut alice = connect(addr, &state).await;
    let mut bob = connect(addr, &state).await;
    let mut carol = connect(addr, &state).await;

    alice.close(None).await.unwrap();
    carol
        .send(Message::text("this is not json".to_string()))
        .await
        .unwrap();

    let registry = state.registry.clone();
    wait_until("both peers to leave", || {
        let registry = registry.clone();
        async move { registry.len() == 1 }
    })
    .await;

    send_message(&mut bob, "bob", "anyone?").await;
    assert_eq!(next_event(&mut bob).await, update("bob", "anyone?"));
    assert_eq!(
        next_event(&mut bob).await,
        json!({ "event": "message", "data": "OK" })
    );
    assert_eq!(state.registry.len(), 1);

    wait_for_history_len(&state, 2).await;
}

#[tokio::test]
async fn test_unknown_events_are_ignored() {
    let (_dir, state) = test_state().await;
    let addr = spawn_server(state.clone()).await;

    let mut alice = connect(addr, &state).await;
    alice
        .send(Message::text(r#"{"event":"typing","data":{}}"#.to_string()))
        .await
        .unwrap();
    send_message(&mut alice, "alice", "still here").await;

    assert_eq!(next_event(&mut alice).await, update("alice", "still here"));
    assert_eq!(state.registry.len(), 1);
}
