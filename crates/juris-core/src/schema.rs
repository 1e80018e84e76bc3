/// Arrow schema definitions for the persisted precedent index.
pub mod index {
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    /// Name of the single vector column in the index file.
    pub const EMBEDDING_COLUMN: &str = "embedding";

    /// Embedding dimensionality of the legal-domain encoder (InLegalBERT).
    pub const DEFAULT_DIM: usize = 768;

    /// Schema for the on-disk vector file: one `FixedSizeList<Float32, dim>`
    /// column holding the precedent embeddings in insertion order.
    pub fn precedent_index_schema(dim: i32) -> Schema {
        Schema::new(vec![Field::new(
            EMBEDDING_COLUMN,
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            false,
        )])
    }
}
