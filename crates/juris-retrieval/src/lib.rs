//! Precedent retrieval: embeds query text and searches the durable index.

mod service;

pub use service::{AddReceipt, PrecedentSearchService, RetrievalError, SearchReport};
