//! JSON document collection with atomic writes
//!
//! Each collection is a single `<name>.json` file holding every entry in
//! append order plus the next sequence number. The whole file is rewritten
//! through a temp file and an atomic rename on every mutation, and the
//! in-memory image is only committed once that write has succeeded.

use crate::models::Record;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode collection: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("collection file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// On-disk layout of a collection file
#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile<T> {
    next_seq: u64,
    entries: Vec<Record<T>>,
}

impl<T> Default for CollectionFile<T> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            entries: Vec::new(),
        }
    }
}

/// Ordered, append-only collection of `T` persisted as one JSON document.
///
/// All mutations go through one async mutex, so appends are serialized and a
/// `clear` is fully applied before the next append or read observes the
/// collection.
pub struct JsonCollection<T> {
    name: String,
    path: PathBuf,
    state: Mutex<CollectionFile<T>>,
}

impl<T> JsonCollection<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Open (or create) the collection `name` inside `dir`
    pub async fn open(dir: impl AsRef<Path>, name: &str) -> StoreResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await.map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(format!("{}.json", name));
        let state = Self::load(&path).await?;

        info!(
            "Opened collection '{}' with {} entries at {:?}",
            name,
            state.entries.len(),
            path
        );

        Ok(Self {
            name: name.to_string(),
            path,
            state: Mutex::new(state),
        })
    }

    async fn load(path: &Path) -> StoreResult<CollectionFile<T>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CollectionFile::default())
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut file: CollectionFile<T> =
            serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        // Older files may have been edited by hand; keep the counter ahead.
        let max_seq = file.entries.iter().map(|r| r.seq + 1).max().unwrap_or(0);
        file.next_seq = file.next_seq.max(max_seq);
        file.entries.sort_by_key(|r| r.seq);
        Ok(file)
    }

    /// Write the collection to disk atomically
    async fn persist(&self, state: &CollectionFile<T>) -> StoreResult<()> {
        let temp_path = self.path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(state).map_err(StoreError::Serialize)?;

        fs::write(&temp_path, json)
            .await
            .map_err(|source| StoreError::Io {
                path: temp_path.clone(),
                source,
            })?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// Append an entry and return its stored record once it is on disk
    pub async fn append(&self, item: T) -> StoreResult<Record<T>> {
        let mut state = self.state.lock().await;

        let record = Record {
            seq: state.next_seq,
            created_at: Utc::now(),
            item,
        };
        state.entries.push(record.clone());
        state.next_seq += 1;

        if let Err(e) = self.persist(&state).await {
            state.entries.pop();
            state.next_seq -= 1;
            return Err(e);
        }

        debug!("Appended #{} to collection '{}'", record.seq, self.name);
        Ok(record)
    }

    /// All entries in append order
    pub async fn read_all(&self) -> Vec<Record<T>> {
        self.state.lock().await.entries.clone()
    }

    /// The first `limit` entries in append order
    pub async fn read_first(&self, limit: usize) -> Vec<Record<T>> {
        let state = self.state.lock().await;
        state.entries.iter().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every entry. Sequence numbers keep counting from where they were.
    pub async fn clear(&self) -> StoreResult<()> {
        let mut state = self.state.lock().await;

        let cleared = CollectionFile {
            next_seq: state.next_seq,
            entries: Vec::new(),
        };
        self.persist(&cleared).await?;

        let removed = state.entries.len();
        *state = cleared;

        info!("Cleared {} entries from collection '{}'", removed, self.name);
        Ok(())
    }
}
