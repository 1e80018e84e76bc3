//! Storage layer: durable precedent vector index (Arrow IPC + JSON metadata)
//! with exact nearest-neighbor search.

mod error;
mod index;

pub use error::StoreError;
pub use index::{INDEX_FILE, IndexStore, META_FILE, PrecedentIndex, PrecedentMeta};
