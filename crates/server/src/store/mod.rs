//! Document storage
//!
//! JSON collections with atomic writes, used for chat history and notes.

pub mod json_store;

pub use json_store::{JsonCollection, StoreError, StoreResult};
