
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::embeddings::Chunk;
use crate::{Error, Result};

/// Provenance of one indexed chunk, stored at the same position as its vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkRecord {
    pub source: PathBuf,
    pub chunk_id: String,
    /// Absent in metadata written without chunk text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl From<&Chunk> for ChunkRecord {
    #[inline]
    fn from(chunk: &Chunk) -> Self {
        Self {
            source: chunk.source.clone(),
            chunk_id: chunk.chunk_id.clone(),
            text: Some(chunk.text.clone()),
        }
    }
}

/// Ordered list of chunk records, persisted as a JSON array in row order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    records: Vec<ChunkRecord>,
}

impl MetadataStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, record: ChunkRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    #[inline]
    pub fn get(&self, row: usize) -> Option<&ChunkRecord> {
        self.records.get(row)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.records.iter()
    }

    #[inline]
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChunkRecord> {
        self.records.iter_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &self.records)?;
        writer.flush()?;
        debug!("Saved {} metadata records to {}", self.len(), path.display());
        Ok(())
    }

    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::Config(format!("cannot open metadata file {}: {e}", path.display()))
        })?;
        let records: Vec<ChunkRecord> = serde_json::from_reader(BufReader::new(file))?;
        debug!("Loaded {} metadata records from {}", records.len(), path.display());
        Ok(Self { records })
    }
}
