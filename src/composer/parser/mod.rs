
use serde::{Deserialize, Serialize};

const QUESTION_LABELS: &[&str] = &["question:", "q:"];
const ANSWER_LABELS: &[&str] = &["answer:", "a:"];
const FALLBACK_EXCLUDED: &[&str] = &["question:", "answer:"];
const FALLBACK_MIN_WORDS: usize = 5;

/// A question/answer pair; neither side is ever empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    #[serde(rename = "Front")]
    pub front: String,
    #[serde(rename = "Back")]
    pub back: String,
}

impl Flashcard {
    #[inline]
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

/// Turn free-form model output into flashcards.
///
/// Labelled `Question:`/`Answer:` pairs are read first. Only when none are
/// found does every sufficiently long unlabelled line become a synthetic
/// "What is ...?" card.
#[inline]
pub fn parse_flashcards(raw: &str) -> Vec<Flashcard> {
    let cards = parse_labelled(raw);
    if cards.is_empty() {
        parse_fallback(raw)
    } else {
        cards
    }
}

fn parse_labelled(raw: &str) -> Vec<Flashcard> {
    let mut cards = Vec::new();
    let mut pending: Option<String> = None;

    for line in raw.lines().map(str::trim) {
        let lowered = line.to_lowercase();
        if has_label(&lowered, QUESTION_LABELS) {
            let question = label_value(line);
            pending = (!question.is_empty()).then(|| question.to_string());
        } else if has_label(&lowered, ANSWER_LABELS) {
            let answer = label_value(line);
            if answer.is_empty() {
                continue;
            }
            if let Some(question) = pending.take() {
                cards.push(Flashcard::new(question, answer));
            }
        }
    }

    cards
}

fn parse_fallback(raw: &str) -> Vec<Flashcard> {
    raw.lines()
        .map(str::trim)
        .filter(|line| line.split_whitespace().count() >= FALLBACK_MIN_WORDS)
        .filter(|line| !has_label(&line.to_lowercase(), FALLBACK_EXCLUDED))
        .filter_map(|line| {
            let first_word = line.split_whitespace().next()?;
            Some(Flashcard::new(
                format!("What is {}?", capitalize(first_word)),
                line,
            ))
        })
        .collect()
}

fn has_label(lowered: &str, labels: &[&str]) -> bool {
    labels.iter().any(|label| lowered.starts_with(label))
}

/// Text after the first colon, trimmed
fn label_value(line: &str) -> &str {
    line.split_once(':').map_or("", |(_, value)| value.trim())
}

/// Upper-case the first character and lower-case the rest
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}
