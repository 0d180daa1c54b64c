//! Persistent storage for embedded chunks

pub mod corpus;
pub mod metadata;
pub mod vector_index;

pub use corpus::IndexedCorpus;
pub use metadata::{ChunkRecord, MetadataStore};
pub use vector_index::{SearchHit, VectorIndex, normalize};
