//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::warn;

use crate::auth::AuthManager;
use crate::chat::registry::CONNECTION_BUFFER_SIZE;
use crate::chat::responder::{DEFAULT_BOT_NAME, DEFAULT_BOT_REPLY};
use crate::chat::{ConnectionRegistry, HistoryStore, Responder};
use crate::notes::Notebook;
use crate::uploads::UploadStore;

/// Configuration for the WAD server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Root directory for collections and the users database
    pub data_dir: PathBuf,
    /// Directory uploaded images are written to
    pub upload_dir: PathBuf,
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Display name of the automated responder
    pub bot_name: String,
    /// Text the responder answers with
    pub bot_reply: String,
    /// Per-connection outbound queue size
    pub connection_buffer: usize,
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,
    /// Request body limit for uploads, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("wad_data");
        Self {
            upload_dir: data_dir.join("upload"),
            data_dir,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            bot_name: DEFAULT_BOT_NAME.to_string(),
            bot_reply: DEFAULT_BOT_REPLY.to_string(),
            connection_buffer: CONNECTION_BUFFER_SIZE,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `WAD_*` environment variables
    pub fn from_env() -> Self {
        let mut config = match std::env::var("WAD_ROOT") {
            Ok(root) => Self::with_base_dir(root),
            Err(_) => Self::default(),
        };

        if let Some(addr) = env_parse("WAD_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(name) = std::env::var("WAD_BOT_NAME") {
            config.bot_name = name;
        }
        if let Ok(reply) = std::env::var("WAD_BOT_REPLY") {
            config.bot_reply = reply;
        }
        if let Some(buffer) = env_parse("WAD_CONNECTION_BUFFER") {
            config.connection_buffer = buffer;
        }
        if let Some(cost) = env_parse("WAD_BCRYPT_COST") {
            config.bcrypt_cost = cost;
        }
        config
    }

    /// Create config with custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let data_dir = base_dir.into();
        Self {
            upload_dir: data_dir.join("upload"),
            data_dir,
            ..Self::default()
        }
    }

    pub fn users_db_path(&self) -> PathBuf {
        self.data_dir.join("users.sqlite")
    }

    /// Ensure all directories exist
    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        Ok(())
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub registry: Arc<ConnectionRegistry>,
    pub history: Arc<dyn HistoryStore>,
    pub responder: Arc<dyn Responder>,
    pub auth: Arc<AuthManager>,
    pub uploads: Arc<UploadStore>,
    pub notebook: Arc<Notebook>,
}
