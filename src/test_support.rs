//! Deterministic stand-ins for the embedding and completion capabilities

use std::cell::{Cell, RefCell};

use crate::composer::Completer;
use crate::embeddings::{Embedder, Vector};
use crate::{Error, Result};

/// Bag-of-words embedder over a fixed vocabulary, one axis per term plus a
/// small bias axis so no vector is all zeros
pub(crate) struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    pub(crate) calls: Cell<usize>,
}

impl KeywordEmbedder {
    pub(crate) fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
            calls: Cell::new(0),
        }
    }

    pub(crate) fn dimension(&self) -> usize {
        self.vocabulary.len() + 1
    }

    fn embed(&self, text: &str) -> Vector {
        let lowered = text.to_lowercase();
        let words = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>();

        let mut vector = self
            .vocabulary
            .iter()
            .map(|term| words.iter().filter(|w| *w == term).count() as f32)
            .collect::<Vec<_>>();
        vector.push(0.01);
        vector
    }
}

impl Embedder for KeywordEmbedder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vector>> {
        self.calls.set(self.calls.get() + 1);
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

/// Embedder that always fails
pub(crate) struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn encode(&self, _texts: &[String]) -> Result<Vec<Vector>> {
        Err(Error::Embedding("embedding backend unavailable".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing-test"
    }
}

/// Completer returning a canned response and recording every prompt
pub(crate) struct ScriptedCompleter {
    response: String,
    pub(crate) prompts: RefCell<Vec<String>>,
}

impl ScriptedCompleter {
    pub(crate) fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.prompts.borrow().len()
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.prompts.borrow().last().cloned()
    }
}

impl Completer for ScriptedCompleter {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.response.clone())
    }
}
