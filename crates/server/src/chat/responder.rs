//! Automated replies injected after each user message

use crate::models::ChatMessage;

pub const DEFAULT_BOT_NAME: &str = "Bot";
pub const DEFAULT_BOT_REPLY: &str = "OK";

/// Produces the bot reply for an incoming user message.
///
/// Implementations must be pure: no I/O, no shared state.
pub trait Responder: Send + Sync {
    fn respond(&self, message: &ChatMessage) -> ChatMessage;
}

impl<F> Responder for F
where
    F: Fn(&ChatMessage) -> ChatMessage + Send + Sync,
{
    fn respond(&self, message: &ChatMessage) -> ChatMessage {
        self(message)
    }
}

/// Constant acknowledgment, regardless of the input
#[derive(Debug, Clone)]
pub struct AckResponder {
    bot_name: String,
    reply: String,
}

impl AckResponder {
    pub fn new(bot_name: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            bot_name: bot_name.into(),
            reply: reply.into(),
        }
    }
}

impl Default for AckResponder {
    fn default() -> Self {
        Self::new(DEFAULT_BOT_NAME, DEFAULT_BOT_REPLY)
    }
}

impl Responder for AckResponder {
    fn respond(&self, _message: &ChatMessage) -> ChatMessage {
        ChatMessage::new(&self.bot_name, &self.reply)
    }
}
