//! Real-time chat
//!
//! Connection registry, history seam, responder and the per-connection
//! session state machine. The WebSocket transport lives in `handlers::chat`.

pub mod history;
pub mod protocol;
pub mod registry;
pub mod responder;
pub mod session;

pub use history::HistoryStore;
pub use protocol::{parse_client_frame, ProtocolError, ServerEvent, SessionEvent};
pub use registry::{
    connection_channel, Connection, ConnectionRegistry, DeliveryError, RegistrationHandle,
};
pub use responder::{AckResponder, Responder};
pub use session::{ChatSession, SessionError, SessionState};
