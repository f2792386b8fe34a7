//! WebSocket transport for the chat
//!
//! Each connection gets two tasks: a writer that sends the history replay and
//! then drains the connection's bounded queue into the socket, and the reader
//! loop below, which turns frames into session events and drives the
//! [`ChatSession`].

use crate::chat::{connection_channel, parse_client_frame, ChatSession, ServerEvent, SessionEvent};
use crate::config::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

/// GET /chat/ws
pub async fn chat_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Write one event to the socket. Returns `false` once the peer is gone.
async fn send_event(sink: &mut SplitSink<WebSocket, Message>, event: ServerEvent) -> bool {
    let frame = match event.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Failed to encode chat event: {}", e);
            return true;
        }
    };
    sink.send(Message::Text(frame.into())).await.is_ok()
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = connection_channel(state.config.connection_buffer);

    let mut session = ChatSession::new(
        tx,
        state.registry.clone(),
        state.history.clone(),
        state.responder.clone(),
    );

    let replay = match session.open().await {
        Ok(replay) => replay,
        Err(e) => {
            error!("Failed to open chat session: {}", e);
            return;
        }
    };

    // Replay goes out first; live events wait in the connection queue meanwhile
    let writer = tokio::spawn(async move {
        for entry in replay {
            if !send_event(&mut ws_sender, ServerEvent::Update(entry)).await {
                return;
            }
        }
        while let Some(event) = rx.recv().await {
            if !send_event(&mut ws_sender, event).await {
                // Peer gone; dropping rx makes further deliveries fail fast
                return;
            }
        }
        let _ = ws_sender.close().await;
    });

    while let Some(frame) = ws_receiver.next().await {
        let event = match frame {
            Ok(Message::Text(text)) => match parse_client_frame(text.as_str()) {
                Ok(Some(event)) => event,
                Ok(None) => {
                    debug!("Ignoring unhandled chat event: {}", text.as_str());
                    continue;
                }
                Err(e) => {
                    warn!("Protocol error, closing chat connection: {}", e);
                    SessionEvent::Disconnect
                }
            },
            Ok(Message::Close(_)) => SessionEvent::Disconnect,
            // Binary, ping and pong frames carry nothing for us
            Ok(_) => continue,
            Err(e) => {
                debug!("WebSocket receive error: {}", e);
                SessionEvent::Disconnect
            }
        };

        if let Err(e) = session.dispatch(event).await {
            error!("Chat operation failed: {}", e);
        }
        if session.is_closed() {
            break;
        }
    }

    // Dropping the session releases the last sender, which ends the writer
    session.close();
    drop(session);
    if let Err(e) = writer.await {
        debug!("Chat writer task ended abnormally: {}", e);
    }
    info!("Chat connection finished");
}
