use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{info, warn};

use crate::composer::{Completer, Composer, Flashcard, write_flashcards_csv};
use crate::config::Config;
use crate::embeddings::{Embedder, OllamaClient, TextChunker};
use crate::retrieval::Retriever;
use crate::store::IndexedCorpus;

/// Chunk every text file in `corpus_dir`, embed the chunks and write a fresh
/// index over them
#[inline]
pub fn build_index<E: Embedder>(
    config: &Config,
    corpus_dir: &Path,
    embedder: &E,
) -> Result<IndexedCorpus> {
    if !corpus_dir.is_dir() {
        bail!("Corpus directory not found: {}", corpus_dir.display());
    }
    // Stored sources must not depend on the working directory
    let corpus_dir = corpus_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", corpus_dir.display()))?;
    let corpus_dir = corpus_dir.as_path();

    info!("Loading and chunking .txt files from {}", corpus_dir.display());
    let chunker = TextChunker::new(config.chunking).context("Invalid chunking configuration")?;
    let chunks = chunker
        .load_and_chunk_directory(corpus_dir)
        .context("Failed to chunk corpus")?;

    if chunks.is_empty() {
        warn!(
            "No text found in {}, the index will be empty",
            corpus_dir.display()
        );
    }

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(chunks.len() as u64).with_style(
            ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks")
                .context("Invalid progress bar template")?,
        )
    } else {
        ProgressBar::hidden()
    };

    let corpus = IndexedCorpus::build(
        &chunks,
        embedder,
        config.ollama.batch_size as usize,
        &bar,
    )
    .context("Failed to embed corpus")?;
    bar.finish_and_clear();

    corpus
        .save(&config.vector_index_path(), &config.metadata_path())
        .context("Failed to save index")?;

    Ok(corpus)
}

/// Load the persisted index, refusing a misaligned one and filling in any
/// chunk text missing from older metadata files
#[inline]
pub fn load_corpus(config: &Config) -> Result<IndexedCorpus> {
    let mut corpus = IndexedCorpus::load(&config.vector_index_path(), &config.metadata_path())
        .context("Failed to load index, run `cardsmith build` first")?;
    corpus.verify_alignment()?;

    let chunker = TextChunker::new(config.chunking).context("Invalid chunking configuration")?;
    let filled = corpus.rehydrate_text(&chunker)?;
    if filled > 0 {
        info!("Recovered text for {} chunks from their sources", filled);
    }

    Ok(corpus)
}

/// Answer `question` from the `qa_top_k` most similar chunks
#[inline]
pub fn ask_question<E: Embedder, C: Completer>(
    config: &Config,
    corpus: &IndexedCorpus,
    embedder: &E,
    completer: &C,
    question: &str,
) -> Result<String> {
    let chunks = Retriever::new(embedder, corpus)
        .retrieve(question, config.retrieval.qa_top_k)
        .context("Failed to retrieve context")?;

    let answer = Composer::new(completer)
        .answer(question, &chunks)
        .context("Failed to generate answer")?;
    Ok(answer)
}

/// Generate flashcards about `topic`, writing them to `output` when any were
/// produced
#[inline]
pub fn generate_flashcards<E: Embedder, C: Completer>(
    config: &Config,
    corpus: &IndexedCorpus,
    embedder: &E,
    completer: &C,
    topic: &str,
    output: &Path,
) -> Result<Vec<Flashcard>> {
    let chunks = Retriever::new(embedder, corpus)
        .retrieve(topic, config.retrieval.flashcard_top_k)
        .context("Failed to retrieve context")?;

    let cards = Composer::new(completer)
        .flashcards(&chunks)
        .context("Failed to generate flashcards")?;

    if cards.is_empty() {
        info!("No flashcards generated for {:?}", topic);
    } else {
        write_flashcards_csv(output, &cards)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }

    Ok(cards)
}

/// Show the state of the data directory, the index and the Ollama server
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("📊 Cardsmith Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("📁 Data Directory: {}", config.base_dir.display());

    println!();
    println!("📚 Corpus:");
    let corpus_dir = config.corpus_dir();
    match count_text_files(&corpus_dir) {
        Ok(count) => println!("   📄 {} text files in {}", count, corpus_dir.display()),
        Err(e) => println!("   ❌ {}: {}", corpus_dir.display(), e),
    }

    println!();
    println!("🔍 Index Status:");
    match IndexedCorpus::load(&config.vector_index_path(), &config.metadata_path()) {
        Ok(corpus) => {
            println!("   📊 Vector rows: {}", corpus.len());
            println!("   📊 Metadata records: {}", corpus.metadata().len());
            println!("   🔢 Dimension: {}", corpus.dimension());
            match corpus.verify_alignment() {
                Ok(()) => println!("   ✅ Index and metadata are consistent"),
                Err(e) => println!("   ⚠️  {}", e),
            }
            let without_text = corpus
                .metadata()
                .iter()
                .filter(|record| record.text.is_none())
                .count();
            if without_text > 0 {
                println!(
                    "   📝 {} records have no stored text and will be re-chunked on load",
                    without_text
                );
            }
        }
        Err(e) => println!("   ❌ Not available - {}", e),
    }

    println!();
    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Embedding Model: {}", client.model_name());
                println!("   💬 Completion Model: {}", client.completion_model());
                println!("   🔢 Batch Size: {}", config.ollama.batch_size);
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Unhealthy - {:#}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Invalid configuration - {:#}", e);
        }
    }

    Ok(())
}

fn count_text_files(dir: &Path) -> Result<usize> {
    let pattern = dir.join("*.txt");
    let count = glob::glob(&pattern.to_string_lossy())
        .context("Invalid corpus path")?
        .filter_map(std::result::Result::ok)
        .count();
    Ok(count)
}
