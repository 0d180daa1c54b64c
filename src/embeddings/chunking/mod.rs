
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// A bounded slice of a source document, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text
    pub text: String,
    /// The document this chunk was cut from
    pub source: PathBuf,
    /// `{source_stem}_c{ordinal}`, ordinal counted from 0 within the source
    pub chunk_id: String,
}

/// Configuration for text chunking. Lengths are measured in characters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length
    pub chunk_size: usize,
    /// Characters of trailing context carried into the next chunk
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 200,
        }
    }
}

/// Separators tried in order: paragraph break, line break, sentence end, space.
/// Each match is kept at the start of the piece that follows it.
const SEPARATOR_PATTERNS: [&str; 4] = [r"\n\n", r"\n", r"(?<=[.!?])\s", r" "];

/// Recursive character splitter producing overlapping chunks
#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkingConfig,
    separators: Vec<Regex>,
}

impl TextChunker {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }

        let separators = SEPARATOR_PATTERNS
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    Error::Chunking(format!("invalid separator pattern {pattern:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            separators,
        })
    }

    #[inline]
    pub const fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split text into overlapping chunks of at most `chunk_size` characters.
    ///
    /// A run of text with no separator left to split on is emitted whole even
    /// when it exceeds `chunk_size`.
    #[inline]
    pub fn split_text(&self, text: &str) -> Result<Vec<String>> {
        let mut chunks = Vec::new();
        if text.trim().is_empty() {
            return Ok(chunks);
        }
        self.split_recursive(text, &self.separators, &mut chunks)?;
        Ok(chunks)
    }

    /// Chunk one document and assign each chunk its id
    #[inline]
    pub fn chunk_document(&self, source: &Path, text: &str) -> Result<Vec<Chunk>> {
        let stem = source_stem(source);
        let chunks = self
            .split_text(text)?
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| Chunk {
                text,
                source: source.to_path_buf(),
                chunk_id: chunk_id(&stem, ordinal),
            })
            .collect::<Vec<_>>();

        debug!(
            "Chunked {} into {} chunks",
            source.display(),
            chunks.len()
        );
        Ok(chunks)
    }

    /// Read and chunk every `*.txt` file in `dir`, in path order
    #[inline]
    pub fn load_and_chunk_directory(&self, dir: &Path) -> Result<Vec<Chunk>> {
        let pattern = dir.join("*.txt");
        let pattern = pattern.to_string_lossy();

        let mut files = glob::glob(&pattern)
            .map_err(|e| Error::Config(format!("invalid corpus pattern {pattern}: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Io(e.into_error()))?;
        files.sort();

        let mut chunks = Vec::new();
        for file in &files {
            let text = fs::read_to_string(file)?;
            let document_chunks = self.chunk_document(file, &text)?;
            info!(
                "{} -> {} chunks",
                file.display(),
                document_chunks.len()
            );
            chunks.extend(document_chunks);
        }

        Ok(chunks)
    }

    fn split_recursive(
        &self,
        text: &str,
        separators: &[Regex],
        out: &mut Vec<String>,
    ) -> Result<()> {
        let mut separator = None;
        let mut remaining: &[Regex] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_match(text).map_err(regex_error)? {
                separator = Some(candidate);
                remaining = &separators[i + 1..];
                break;
            }
        }

        let pieces = match separator {
            Some(separator) => split_keeping_separator(text, separator)?,
            None => vec![text],
        };

        let mut fitting = Vec::new();
        for piece in pieces {
            if char_len(piece) <= self.config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                out.extend(self.merge_pieces(&fitting));
                fitting.clear();
            }

            if remaining.is_empty() {
                let piece = piece.trim();
                if piece.is_empty() {
                    continue;
                }
                warn!(
                    "Emitting a chunk of {} characters, longer than the configured {}",
                    char_len(piece),
                    self.config.chunk_size
                );
                out.push(piece.to_string());
            } else {
                self.split_recursive(piece, remaining, out)?;
            }
        }

        if !fitting.is_empty() {
            out.extend(self.merge_pieces(&fitting));
        }

        Ok(())
    }

    /// Greedily merge small pieces into chunks, carrying up to `chunk_overlap`
    /// characters of trailing pieces into the next chunk
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let ChunkingConfig {
            chunk_size,
            chunk_overlap,
        } = self.config;

        let mut merged = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > chunk_size && !window.is_empty() {
                merged.extend(join_window(&window));

                while total > chunk_overlap || (total > 0 && total + len > chunk_size) {
                    let Some((_, front_len)) = window.pop_front() else {
                        break;
                    };
                    total -= front_len;
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        merged.extend(join_window(&window));
        merged
    }
}

fn join_window(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined = window.iter().map(|(piece, _)| *piece).collect::<String>();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Split `text` before every separator match so the separator leads the next piece
fn split_keeping_separator<'t>(text: &'t str, separator: &Regex) -> Result<Vec<&'t str>> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for found in separator.find_iter(text) {
        let found = found.map_err(regex_error)?;
        if found.start() > start {
            pieces.push(&text[start..found.start()]);
            start = found.start();
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    Ok(pieces)
}

fn regex_error(e: fancy_regex::Error) -> Error {
    Error::Chunking(format!("separator matching failed: {e}"))
}

#[inline]
fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// File stem used as the chunk id prefix
#[inline]
pub fn source_stem(source: &Path) -> String {
    source.file_stem().map_or_else(
        || source.to_string_lossy().into_owned(),
        |stem| stem.to_string_lossy().into_owned(),
    )
}

#[inline]
pub fn chunk_id(stem: &str, ordinal: usize) -> String {
    format!("{stem}_c{ordinal}")
}
