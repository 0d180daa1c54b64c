//! Nearest-chunk retrieval over an [`IndexedCorpus`]


use tracing::{debug, warn};

use crate::embeddings::Embedder;
use crate::store::{ChunkRecord, IndexedCorpus, normalize};
use crate::{Error, Result};

/// A retrieved chunk: its row, its stored record and its similarity score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkRef<'a> {
    pub row: usize,
    pub record: &'a ChunkRecord,
    pub score: f32,
}

impl ChunkRef<'_> {
    #[inline]
    pub fn text(&self) -> Option<&str> {
        self.record.text.as_deref()
    }
}

pub struct Retriever<'a, E: Embedder> {
    embedder: &'a E,
    corpus: &'a IndexedCorpus,
}

impl<'a, E: Embedder> Retriever<'a, E> {
    #[inline]
    pub const fn new(embedder: &'a E, corpus: &'a IndexedCorpus) -> Self {
        Self { embedder, corpus }
    }

    /// Rank stored chunks against `query`, best first.
    ///
    /// An empty corpus yields no results without embedding the query.
    #[inline]
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ChunkRef<'a>>> {
        if self.corpus.is_empty() || top_k == 0 {
            debug!("Nothing to retrieve for query (corpus size {})", self.corpus.len());
            return Ok(Vec::new());
        }

        let mut query_vector = self
            .embedder
            .encode(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::Embedding(format!(
                    "{} returned no vector for the query",
                    self.embedder.model_name()
                ))
            })?;
        normalize(&mut query_vector);

        let hits = self.corpus.index().search(&query_vector, top_k)?;
        let corpus = self.corpus;
        let refs = hits
            .into_iter()
            .filter_map(|hit| match corpus.get(hit.row) {
                Some(record) => Some(ChunkRef {
                    row: hit.row,
                    record,
                    score: hit.score,
                }),
                None => {
                    warn!("Index row {} has no metadata record, skipping", hit.row);
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!("Retrieved {} chunks (top_k {})", refs.len(), top_k);
        Ok(refs)
    }
}
