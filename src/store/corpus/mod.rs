
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use super::metadata::{ChunkRecord, MetadataStore};
use super::vector_index::VectorIndex;
use crate::embeddings::{Chunk, Embedder, TextChunker, Vector};
use crate::{Error, Result};

/// Vector index and chunk metadata kept row-aligned behind one interface.
///
/// Row `i` of the index and record `i` of the metadata always describe the
/// same chunk; [`IndexedCorpus::add`] is the only way to grow either.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedCorpus {
    index: VectorIndex,
    metadata: MetadataStore,
}

impl IndexedCorpus {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed `chunks` in batches of `batch_size` and index them in order
    #[inline]
    pub fn build<E: Embedder>(
        chunks: &[Chunk],
        embedder: &E,
        batch_size: usize,
        progress: &ProgressBar,
    ) -> Result<Self> {
        let mut corpus = Self::new();
        progress.set_length(chunks.len() as u64);

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts = batch.iter().map(|c| c.text.clone()).collect::<Vec<_>>();
            let vectors = embedder.encode(&texts)?;

            if vectors.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "{} returned {} vectors for {} texts",
                    embedder.model_name(),
                    vectors.len(),
                    batch.len()
                )));
            }

            for (chunk, vector) in batch.iter().zip(vectors) {
                corpus.add(vector, ChunkRecord::from(chunk))?;
            }
            progress.inc(batch.len() as u64);
        }

        info!(
            "Indexed {} chunks ({} dimensions) with {}",
            corpus.len(),
            corpus.dimension(),
            embedder.model_name()
        );
        Ok(corpus)
    }

    /// Append one vector with its record, returning the shared row
    #[inline]
    pub fn add(&mut self, vector: Vector, record: ChunkRecord) -> Result<usize> {
        let row = self.index.add(vector)?;
        let record_row = self.metadata.push(record);
        debug_assert_eq!(row, record_row);
        Ok(row)
    }

    #[inline]
    pub fn get(&self, row: usize) -> Option<&ChunkRecord> {
        self.metadata.get(row)
    }

    #[inline]
    pub const fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[inline]
    pub const fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Number of vector rows
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub const fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Check that every vector row has exactly one metadata record
    #[inline]
    pub fn verify_alignment(&self) -> Result<()> {
        if self.index.len() == self.metadata.len() {
            Ok(())
        } else {
            Err(Error::JoinInconsistency {
                rows: self.index.len(),
                records: self.metadata.len(),
            })
        }
    }

    #[inline]
    pub fn save(&self, index_path: &Path, metadata_path: &Path) -> Result<()> {
        for path in [index_path, metadata_path] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        // Both halves are fully written before either replaces its old file
        let index_tmp = staging_path(index_path);
        let metadata_tmp = staging_path(metadata_path);
        let written = self
            .index
            .save(&index_tmp)
            .and_then(|()| self.metadata.save(&metadata_tmp));
        if let Err(e) = written {
            for tmp in [&index_tmp, &metadata_tmp] {
                if !tmp.is_file() {
                    continue;
                }
                if let Err(remove_error) = fs::remove_file(tmp) {
                    warn!("Cannot remove {}: {}", tmp.display(), remove_error);
                }
            }
            return Err(e);
        }

        fs::rename(&index_tmp, index_path)?;
        fs::rename(&metadata_tmp, metadata_path)?;

        info!(
            "Saved {} rows to {} and {}",
            self.len(),
            index_path.display(),
            metadata_path.display()
        );
        Ok(())
    }

    /// Load both halves as written. A row-count mismatch is logged, not
    /// rejected; callers decide via [`IndexedCorpus::verify_alignment`].
    #[inline]
    pub fn load(index_path: &Path, metadata_path: &Path) -> Result<Self> {
        let corpus = Self {
            index: VectorIndex::load(index_path)?,
            metadata: MetadataStore::load(metadata_path)?,
        };

        if let Err(e) = corpus.verify_alignment() {
            warn!("{}", e);
        }
        Ok(corpus)
    }

    /// Fill in text for records stored without it by re-chunking their
    /// sources. Returns how many records were filled.
    ///
    /// This only recovers the embedded text when the source files and
    /// chunking parameters are unchanged since the build.
    #[inline]
    pub fn rehydrate_text(&mut self, chunker: &TextChunker) -> Result<usize> {
        let mut missing: HashMap<PathBuf, Vec<usize>> = HashMap::new();
        for (row, record) in self.metadata.iter().enumerate() {
            if record.text.is_none() {
                missing.entry(record.source.clone()).or_default().push(row);
            }
        }

        if missing.is_empty() {
            return Ok(0);
        }

        let mut texts_by_row: HashMap<usize, String> = HashMap::new();
        for (source, rows) in &missing {
            let content = match fs::read_to_string(source) {
                Ok(content) => content,
                Err(e) => {
                    warn!(
                        "Cannot re-read {} to recover {} chunks: {}",
                        source.display(),
                        rows.len(),
                        e
                    );
                    continue;
                }
            };

            let mut by_id = chunker
                .chunk_document(source, &content)?
                .into_iter()
                .map(|chunk| (chunk.chunk_id, chunk.text))
                .collect::<HashMap<_, _>>();

            for &row in rows {
                let Some(record) = self.metadata.get(row) else {
                    continue;
                };
                match by_id.remove(&record.chunk_id) {
                    Some(text) => {
                        texts_by_row.insert(row, text);
                    }
                    None => warn!(
                        "Chunk {} no longer exists in {}",
                        record.chunk_id,
                        source.display()
                    ),
                }
            }
        }

        let filled = texts_by_row.len();
        for (row, record) in self.metadata.iter_mut().enumerate() {
            if let Some(text) = texts_by_row.remove(&row) {
                record.text = Some(text);
            }
        }

        debug!("Recovered text for {} chunk records", filled);
        Ok(filled)
    }
}

/// Sibling path a file is written to before being renamed over `path`
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
