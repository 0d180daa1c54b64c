// Embeddings module
// Text chunking, the embedding capability, and its Ollama implementation

pub mod chunking;
pub mod ollama;

pub use chunking::{Chunk, ChunkingConfig, TextChunker, chunk_id, source_stem};
pub use ollama::OllamaClient;

use crate::Result;

/// A fixed-dimension embedding vector
pub type Vector = Vec<f32>;

/// Maps text to fixed-dimension vectors.
///
/// Implementations return exactly one vector per input, in input order, with
/// the same dimension on every call, and must be deterministic for a given
/// model so that re-embedding a corpus reproduces the same index.
pub trait Embedder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Identifier of the underlying model, for logs and status output
    fn model_name(&self) -> &str;
}

impl<E: Embedder + ?Sized> Embedder for &E {
    #[inline]
    fn encode(&self, texts: &[String]) -> Result<Vec<Vector>> {
        (**self).encode(texts)
    }

    #[inline]
    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
