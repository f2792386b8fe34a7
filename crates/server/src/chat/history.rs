//! Chat history seam
//!
//! The session handler only talks to this trait, so the backing store is
//! injected at construction time.

use crate::models::ChatMessage;
use crate::store::{JsonCollection, StoreResult};
use async_trait::async_trait;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one entry; returns once the backing store has recorded it
    async fn append(&self, entry: ChatMessage) -> StoreResult<()>;

    /// Every entry in append order
    async fn read_all(&self) -> StoreResult<Vec<ChatMessage>>;

    /// Remove every entry
    async fn clear(&self) -> StoreResult<()>;
}

#[async_trait]
impl HistoryStore for JsonCollection<ChatMessage> {
    async fn append(&self, entry: ChatMessage) -> StoreResult<()> {
        JsonCollection::append(self, entry).await.map(|_| ())
    }

    async fn read_all(&self) -> StoreResult<Vec<ChatMessage>> {
        Ok(JsonCollection::read_all(self)
            .await
            .into_iter()
            .map(|record| record.into_item())
            .collect())
    }

    async fn clear(&self) -> StoreResult<()> {
        JsonCollection::clear(self).await
    }
}
