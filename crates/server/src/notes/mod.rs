//! Notebook: free-form notes kept in a JSON collection

use crate::models::{Note, Record};
use crate::store::{JsonCollection, StoreResult};
use std::path::Path;

pub struct Notebook {
    notes: JsonCollection<Note>,
}

impl Notebook {
    pub async fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            notes: JsonCollection::open(dir, "notes").await?,
        })
    }

    pub async fn create(&self, title: &str, content: &str) -> StoreResult<Record<Note>> {
        self.notes
            .append(Note {
                title: title.to_string(),
                content: content.to_string(),
            })
            .await
    }

    /// Notes in insertion order; with a limit, only the oldest `limit` notes
    pub async fn list(&self, limit: Option<usize>) -> Vec<Record<Note>> {
        match limit {
            Some(limit) => self.notes.read_first(limit).await,
            None => self.notes.read_all().await,
        }
    }

    pub async fn clear(&self) -> StoreResult<()> {
        self.notes.clear().await
    }
}
