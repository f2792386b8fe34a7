//! Per-connection chat session state machine
//!
//! ```text
//! Connecting --open()--> Open --Disconnect / protocol error--> Closed
//! ```
//!
//! The transport drives one session per WebSocket from a single loop,
//! turning frames into [`SessionEvent`]s and calling [`ChatSession::dispatch`].
//! It also writes the replay returned by [`ChatSession::open`] to the client
//! ahead of the connection's queue.

use super::history::HistoryStore;
use super::protocol::{ServerEvent, SessionEvent};
use super::registry::{Connection, ConnectionRegistry, RegistrationHandle};
use super::responder::Responder;
use crate::models::ChatMessage;
use crate::store::StoreError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("history store failed: {0}")]
    Store(#[from] StoreError),
}

pub struct ChatSession {
    state: SessionState,
    conn: Connection,
    handle: Option<RegistrationHandle>,
    registry: Arc<ConnectionRegistry>,
    history: Arc<dyn HistoryStore>,
    responder: Arc<dyn Responder>,
}

impl ChatSession {
    pub fn new(
        conn: Connection,
        registry: Arc<ConnectionRegistry>,
        history: Arc<dyn HistoryStore>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            state: SessionState::Connecting,
            conn,
            handle: None,
            registry,
            history,
            responder,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn registration(&self) -> Option<RegistrationHandle> {
        self.handle
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Snapshot the stored history and join the registry.
    ///
    /// Returns the entries to replay. The transport must write them to the
    /// client before anything queued on the connection, since live events
    /// start queueing as soon as this returns.
    pub async fn open(&mut self) -> Result<Vec<ChatMessage>, SessionError> {
        if self.state != SessionState::Connecting {
            return Ok(Vec::new());
        }

        let _join = self.registry.join_guard().await;

        let entries = match self.history.read_all().await {
            Ok(entries) => entries,
            Err(e) => {
                self.state = SessionState::Closed;
                return Err(e.into());
            }
        };

        let handle = self.registry.register(self.conn.clone());
        self.handle = Some(handle);
        self.state = SessionState::Open;

        info!("Chat session {} open, replaying {} entries", handle, entries.len());
        Ok(entries)
    }

    /// React to one inbound event. Events outside the Open state are ignored.
    pub async fn dispatch(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        if self.state != SessionState::Open {
            debug!("Ignoring {:?} in state {:?}", event, self.state);
            return Ok(());
        }

        match event {
            SessionEvent::UserMessage(message) => self.on_user_message(message).await,
            SessionEvent::ClearHistory => {
                let _publish = self.registry.publish_guard().await;
                self.history.clear().await?;
                info!("Chat history cleared");
                Ok(())
            }
            SessionEvent::Disconnect => {
                self.close();
                Ok(())
            }
        }
    }

    async fn on_user_message(&mut self, message: ChatMessage) -> Result<(), SessionError> {
        let Some(handle) = self.handle else {
            return Ok(());
        };

        let _publish = self.registry.publish_guard().await;

        // Broadcast and store the user message before the reply exists, so a
        // replay can never contain a reply without its message.
        self.registry.broadcast(ServerEvent::Update(message.clone()));
        self.history.append(message.clone()).await?;

        let reply = self.responder.respond(&message);
        self.registry
            .send_to(handle, ServerEvent::Message(reply.message.clone()));
        self.history.append(reply).await?;

        Ok(())
    }

    /// Leave the registry. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.registry.unregister(handle);
            info!("Chat session {} closed", handle);
        }
        self.state = SessionState::Closed;
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.close();
    }
}
