//! Connection registry: the active set of open chat connections.

use super::protocol::ServerEvent;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock as GateLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default size of the per-connection send queue.
pub const CONNECTION_BUFFER_SIZE: usize = 64;

/// Sending half of one client's outbound queue.
pub type Connection = mpsc::Sender<ServerEvent>;

/// Opaque id returned by [`ConnectionRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationHandle(Uuid);

impl RegistrationHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("connection is not registered")]
    UnknownConnection,
    #[error("connection closed")]
    Closed,
    #[error("connection queue is full")]
    Full,
}

/// Create the bounded queue for a new connection
pub fn connection_channel(buffer: usize) -> (Connection, mpsc::Receiver<ServerEvent>) {
    mpsc::channel(buffer.max(1))
}

/// Attempt delivery without waiting on a slow peer
fn deliver(conn: &Connection, event: ServerEvent) -> Result<(), DeliveryError> {
    conn.try_send(event).map_err(|e| match e {
        mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
        mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
    })
}

/// Tracks every open chat connection.
///
/// The lock only guards the map; delivery happens on a snapshot taken under
/// the read lock, so a broadcast never holds the lock while sending.
///
/// `gate` orders history changes against joins. Publishers hold it shared
/// across broadcast and append; a joiner holds it exclusively across its
/// history snapshot and registration, so every entry is either in the
/// snapshot or delivered live, never neither.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<RegistrationHandle, Connection>>,
    gate: GateLock<()>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Held while broadcasting and recording a history change
    pub async fn publish_guard(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().await
    }

    /// Held while snapshotting history and registering a new connection
    pub async fn join_guard(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }

    pub fn register(&self, conn: Connection) -> RegistrationHandle {
        let handle = RegistrationHandle::new();
        let mut connections = self.connections.write();
        connections.insert(handle, conn);
        info!(
            "Registered chat connection {} ({} active)",
            handle,
            connections.len()
        );
        handle
    }

    /// Remove a connection. Returns `false` if it was not registered.
    pub fn unregister(&self, handle: RegistrationHandle) -> bool {
        let mut connections = self.connections.write();
        let removed = connections.remove(&handle).is_some();
        if removed {
            info!(
                "Unregistered chat connection {} ({} active)",
                handle,
                connections.len()
            );
        } else {
            debug!("Connection {} already unregistered", handle);
        }
        removed
    }

    /// Deliver `event` to every connection registered right now.
    ///
    /// Returns how many connections accepted it. Failures are logged per peer.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        let targets: Vec<(RegistrationHandle, Connection)> = self
            .connections
            .read()
            .iter()
            .map(|(handle, conn)| (*handle, conn.clone()))
            .collect();

        let mut delivered = 0;
        for (handle, conn) in targets {
            match deliver(&conn, event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Broadcast to connection {} failed: {}", handle, e),
            }
        }

        debug!("Broadcast delivered to {} connections", delivered);
        delivered
    }

    /// Deliver `event` to one connection
    pub fn send_to(&self, handle: RegistrationHandle, event: ServerEvent) -> bool {
        let conn = self.connections.read().get(&handle).cloned();

        let result = match conn {
            Some(conn) => deliver(&conn, event),
            None => Err(DeliveryError::UnknownConnection),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Send to connection {} failed: {}", handle, e);
                false
            }
        }
    }

    pub fn contains(&self, handle: RegistrationHandle) -> bool {
        self.connections.read().contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}
