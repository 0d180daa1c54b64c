use anyhow::Context;
use cardsmith::Result;
use cardsmith::commands::{
    ask_question, build_index, generate_flashcards, load_corpus, show_status,
};
use cardsmith::config::{Config, run_interactive_config, show_config};
use cardsmith::embeddings::OllamaClient;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cardsmith")]
#[command(about = "Ask questions and make study flashcards from your own notes")]
#[command(version)]
struct Cli {
    /// Directory holding the configuration, corpus and index (default: ~/.cardsmith)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Chunk and embed the corpus, replacing any existing index
    Build {
        /// Directory of .txt files to index (default: <data-dir>/raw)
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Answer a question from the indexed corpus
    Ask {
        question: String,
    },
    /// Generate flashcards about a topic and export them as CSV
    Flashcards {
        topic: String,
        /// CSV file to write the cards to
        #[arg(long, default_value = "anki_cards.csv")]
        output: PathBuf,
    },
    /// Show the state of the corpus, index and Ollama server
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => Config::default_dir().context("Failed to locate data directory")?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&data_dir)?;
            } else {
                run_interactive_config(&data_dir)?;
            }
        }
        Commands::Build { corpus } => {
            let config = Config::load(&data_dir)?;
            let corpus_dir = corpus.unwrap_or_else(|| config.corpus_dir());
            let client = OllamaClient::new(&config.ollama)?;

            let corpus = build_index(&config, &corpus_dir, &client)?;
            println!(
                "Indexed {} chunks from {} into {}",
                corpus.len(),
                corpus_dir.display(),
                config.index_dir().display()
            );
        }
        Commands::Ask { question } => {
            let config = Config::load(&data_dir)?;
            let corpus = load_corpus(&config)?;
            let client = OllamaClient::new(&config.ollama)?;

            let answer = ask_question(&config, &corpus, &client, &client, &question)?;
            println!("{}", answer);
        }
        Commands::Flashcards { topic, output } => {
            let config = Config::load(&data_dir)?;
            let corpus = load_corpus(&config)?;
            let client = OllamaClient::new(&config.ollama)?;

            let cards = generate_flashcards(&config, &corpus, &client, &client, &topic, &output)?;
            if cards.is_empty() {
                println!("No flashcards generated.");
            } else {
                for card in &cards {
                    println!("Q: {}\nA: {}\n", card.front, card.back);
                }
                println!("{} flashcards saved to {}", cards.len(), output.display());
            }
        }
        Commands::Status => {
            let config = Config::load(&data_dir)?;
            show_status(&config)?;
        }
    }

    Ok(())
}
