//! Context assembly, prompting and flashcard output for retrieved chunks

#[cfg(test)]
mod tests;

pub mod export;
pub mod parser;

pub use export::write_flashcards_csv;
pub use parser::{Flashcard, parse_flashcards};

use itertools::Itertools;
use tracing::{debug, info};

use crate::Result;
use crate::retrieval::ChunkRef;

/// Fixed answer when no context could be assembled
pub const INSUFFICIENT_INFORMATION: &str =
    "I do not have enough information to answer this question.";

/// Separator placed between chunk texts in an assembled context
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const QA_TEMPLATE: &str = r#"You are an assistant that only answers from the provided context.
If the answer cannot be found in the context, respond exactly: "I do not have enough information to answer this question."

Context:
{context}

Question:
{question}

Answer concisely and cite sources when appropriate.
"#;

const FLASHCARD_TEMPLATE: &str = "You are a flashcard generator.
Your only task is to generate 3-5 concise flashcards from the text.
Do not explain anything, do not add extra text, only output flashcards.

Each flashcard must be in exactly this format (one after another, no numbering, no bullet points):
Question: <short clear question>
Answer: <short correct answer>

Text:
{passage}
";

/// Text completion capability
pub trait Completer {
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<C: Completer + ?Sized> Completer for &C {
    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

pub struct Composer<'a, C: Completer> {
    completer: &'a C,
}

impl<'a, C: Completer> Composer<'a, C> {
    #[inline]
    pub const fn new(completer: &'a C) -> Self {
        Self { completer }
    }

    /// Answer `question` from `chunks`, or [`INSUFFICIENT_INFORMATION`]
    /// without calling the completer when they carry no text
    #[inline]
    pub fn answer(&self, question: &str, chunks: &[ChunkRef<'_>]) -> Result<String> {
        let context = assemble_context(chunks);
        if context.trim().is_empty() {
            info!("No context retrieved, returning the insufficient information answer");
            return Ok(INSUFFICIENT_INFORMATION.to_string());
        }

        let prompt = render_qa_prompt(&context, question);
        debug!("Q&A prompt is {} characters", prompt.chars().count());
        let output = self.completer.complete(&prompt)?;
        Ok(output.trim().to_string())
    }

    /// Generate flashcards from `chunks`; empty context gives no cards
    #[inline]
    pub fn flashcards(&self, chunks: &[ChunkRef<'_>]) -> Result<Vec<Flashcard>> {
        let context = assemble_context(chunks);
        if context.trim().is_empty() {
            info!("No context retrieved, skipping flashcard generation");
            return Ok(Vec::new());
        }

        let output = self.completer.complete(&render_flashcard_prompt(&context))?;
        debug!("Raw flashcard output:\n{}", output);

        let cards = parse_flashcards(&output);
        info!("Parsed {} flashcards", cards.len());
        Ok(cards)
    }
}

/// Join chunk texts best-first with [`CONTEXT_SEPARATOR`].
///
/// Ties in score keep ascending row order. Chunks without stored text are
/// skipped.
#[inline]
pub fn assemble_context(chunks: &[ChunkRef<'_>]) -> String {
    chunks
        .iter()
        .sorted_by(|a, b| b.score.total_cmp(&a.score).then(a.row.cmp(&b.row)))
        .filter_map(ChunkRef::text)
        .join(CONTEXT_SEPARATOR)
}

fn render_qa_prompt(context: &str, question: &str) -> String {
    render(QA_TEMPLATE, &[("{context}", context), ("{question}", question)])
}

fn render_flashcard_prompt(passage: &str) -> String {
    render(FLASHCARD_TEMPLATE, &[("{passage}", passage)])
}

/// Fill placeholders in one left-to-right pass over `template`, so text
/// substituted in is never scanned for further placeholders
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some((at, placeholder, value)) = values
        .iter()
        .filter_map(|&(placeholder, value)| {
            rest.find(placeholder).map(|at| (at, placeholder, value))
        })
        .min_by_key(|&(at, _, _)| at)
    {
        let (before, after) = rest.split_at(at);
        rendered.push_str(before);
        rendered.push_str(value);
        rest = after.strip_prefix(placeholder).unwrap_or(after);
    }

    rendered.push_str(rest);
    rendered
}
