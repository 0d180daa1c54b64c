
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::embeddings::Vector;
use crate::{Error, Result};

const INDEX_MAGIC: &[u8; 8] = b"CSMIDX01";

/// On-disk layout of a [`VectorIndex`]: a magic tag, the shape, then the
/// row-major normalized values
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile<'a> {
    magic: [u8; 8],
    dimension: u64,
    rows: u64,
    data: Cow<'a, [f32]>,
}

/// One search result: a row position and its similarity to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub row: usize,
    pub score: f32,
}

/// Flat inner-product index over L2-normalized vectors.
///
/// Rows are addressed by insertion position. Search is exhaustive, so results
/// are exact cosine similarities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    /// Zero until the first vector fixes it
    dimension: usize,
    /// Row-major storage, `dimension` values per row
    data: Vec<f32>,
}

impl VectorIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from vectors in insertion order
    #[inline]
    pub fn build<I>(vectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vector>,
    {
        let mut index = Self::new();
        for vector in vectors {
            index.add(vector)?;
        }
        Ok(index)
    }

    /// Normalize and append a vector, returning its row
    #[inline]
    pub fn add(&mut self, mut vector: Vector) -> Result<usize> {
        if vector.is_empty() {
            return Err(Error::Index("cannot index an empty vector".to_string()));
        }
        if self.dimension != 0 {
            self.check_dimension(&vector)?;
        }
        check_finite(&vector)?;

        normalize(&mut vector);
        self.dimension = vector.len();
        let row = self.len();
        self.data.extend_from_slice(&vector);
        Ok(row)
    }

    /// Rank every row by inner product with `query`.
    ///
    /// Results are ordered by descending score, ties by ascending row, and
    /// truncated to `k`. An empty index yields no hits.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(query)?;
        check_finite(query)?;

        let mut hits = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, stored)| SearchHit {
                row,
                score: canonical_score(dot(stored, query)),
            })
            .collect::<Vec<_>>();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.row.cmp(&b.row)));
        hits.truncate(k);
        Ok(hits)
    }

    /// Stored (normalized) vector for a row
    #[inline]
    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Write the index to `path` as a bincode-encoded [`IndexFile`]
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        let file = IndexFile {
            magic: *INDEX_MAGIC,
            dimension: self.dimension as u64,
            rows: self.len() as u64,
            data: Cow::Borrowed(&self.data),
        };
        bincode::serialize_into(&mut writer, &file).map_err(|e| {
            Error::Index(format!("cannot write vector index {}: {e}", path.display()))
        })?;
        writer.flush()?;

        debug!(
            "Saved {} rows of dimension {} to {}",
            self.len(),
            self.dimension,
            path.display()
        );
        Ok(())
    }

    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::Config(format!("cannot open vector index {}: {e}", path.display()))
        })?;
        let mut reader = BufReader::new(file);

        let file: IndexFile<'static> = bincode::deserialize_from(&mut reader).map_err(|e| {
            Error::Index(format!("{} is truncated or corrupt: {e}", path.display()))
        })?;
        if &file.magic != INDEX_MAGIC {
            return Err(Error::Index(format!(
                "{} is not a vector index file",
                path.display()
            )));
        }
        if file.dimension == 0 && file.rows > 0 {
            return Err(Error::Index(format!(
                "{} has rows but no dimension",
                path.display()
            )));
        }

        let expected = file.dimension.checked_mul(file.rows);
        if expected != Some(file.data.len() as u64) {
            return Err(Error::Index(format!(
                "{} is corrupt: header says {} rows of dimension {}, found {} values",
                path.display(),
                file.rows,
                file.dimension,
                file.data.len()
            )));
        }

        debug!(
            "Loaded {} rows of dimension {} from {}",
            file.rows,
            file.dimension,
            path.display()
        );

        Ok(Self {
            dimension: usize::try_from(file.dimension).map_err(|_| {
                Error::Index(format!("{} has an invalid dimension", path.display()))
            })?,
            data: file.data.into_owned(),
        })
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            })
        }
    }
}

/// Scale a vector to unit L2 norm; a zero vector is left unchanged
#[inline]
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Fold -0.0 into 0.0 so equal scores tie, and sink NaN to the bottom
fn canonical_score(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else if score == 0.0 {
        0.0
    } else {
        score
    }
}

fn check_finite(vector: &[f32]) -> Result<()> {
    if vector.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::Index("vector contains non-finite values".to_string()))
    }
}
