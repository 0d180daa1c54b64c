use super::*;
use crate::store::ChunkRecord;
use crate::test_support::ScriptedCompleter;
use std::path::PathBuf;

fn record(chunk_id: &str, text: Option<&str>) -> ChunkRecord {
    ChunkRecord {
        source: PathBuf::from("raw/dsa.txt"),
        chunk_id: chunk_id.to_string(),
        text: text.map(str::to_string),
    }
}

fn chunk_ref(row: usize, record: &ChunkRecord, score: f32) -> ChunkRef<'_> {
    ChunkRef { row, record, score }
}

#[test]
fn context_orders_by_score_then_row() {
    let a = record("dsa_c0", Some("A"));
    let b = record("dsa_c1", Some("B"));
    let c = record("dsa_c2", Some("C"));
    let d = record("dsa_c3", Some("D"));
    let refs = [
        chunk_ref(3, &d, 0.5),
        chunk_ref(0, &a, 0.2),
        chunk_ref(2, &c, 0.9),
        chunk_ref(1, &b, 0.5),
    ];

    assert_eq!(
        assemble_context(&refs),
        "C\n\n---\n\nB\n\n---\n\nD\n\n---\n\nA"
    );
}

#[test]
fn context_skips_chunks_without_text() {
    let a = record("dsa_c0", None);
    let b = record("dsa_c1", Some("Binary heaps."));
    let refs = [chunk_ref(0, &a, 0.9), chunk_ref(1, &b, 0.1)];

    assert_eq!(assemble_context(&refs), "Binary heaps.");
    assert_eq!(assemble_context(&[]), "");
}

#[test]
fn answer_short_circuits_without_context() {
    let completer = ScriptedCompleter::new("should never be used");
    let composer = Composer::new(&completer);

    let answer = composer.answer("What is a heap?", &[]).expect("answer");
    assert_eq!(answer, INSUFFICIENT_INFORMATION);

    let blank = record("dsa_c0", Some("   \n"));
    let answer = composer
        .answer("What is a heap?", &[chunk_ref(0, &blank, 1.0)])
        .expect("answer");
    assert_eq!(answer, INSUFFICIENT_INFORMATION);
    assert_eq!(completer.call_count(), 0);
}

#[test]
fn answer_fills_prompt_and_trims_output() {
    let completer = ScriptedCompleter::new("\n  Insertion at the head is O(1).  \n");
    let composer = Composer::new(&completer);
    let text = record("dsa_c0", Some("Inserting at the head of a singly linked list is O(1)."));

    let answer = composer
        .answer("How fast is head insertion?", &[chunk_ref(0, &text, 0.8)])
        .expect("answer");
    assert_eq!(answer, "Insertion at the head is O(1).");
    assert_eq!(completer.call_count(), 1);

    let prompt = completer.last_prompt().expect("prompt recorded");
    assert!(prompt.contains("Context:\nInserting at the head of a singly linked list is O(1).\n"));
    assert!(prompt.contains("Question:\nHow fast is head insertion?\n"));
    assert!(prompt.contains(INSUFFICIENT_INFORMATION));
}

#[test]
fn flashcards_short_circuit_without_context() {
    let completer = ScriptedCompleter::new("Question: Q\nAnswer: A");
    let cards = Composer::new(&completer).flashcards(&[]).expect("flashcards");

    assert!(cards.is_empty());
    assert_eq!(completer.call_count(), 0);
}

#[test]
fn flashcards_parse_completer_output() {
    let completer = ScriptedCompleter::new(
        "Question: What is a BST?\nAnswer: A binary search tree.\nQuestion: Lookup cost?\nAnswer: O(log n) when balanced.",
    );
    let text = record("dsa_c0", Some("A binary search tree keeps keys ordered."));

    let cards = Composer::new(&completer)
        .flashcards(&[chunk_ref(0, &text, 0.7)])
        .expect("flashcards");
    assert_eq!(
        cards,
        vec![
            Flashcard::new("What is a BST?", "A binary search tree."),
            Flashcard::new("Lookup cost?", "O(log n) when balanced."),
        ]
    );

    let prompt = completer.last_prompt().expect("prompt recorded");
    assert!(prompt.contains("3-5 concise flashcards"));
    assert!(prompt.ends_with("Text:\nA binary search tree keeps keys ordered.\n"));
}

#[test]
fn answer_passes_placeholder_text_in_context_through() {
    let completer = ScriptedCompleter::new("Answer.");
    let text = record("dsa_c0", Some("Templates use the {question} placeholder."));

    Composer::new(&completer)
        .answer("What is a heap?", &[chunk_ref(0, &text, 0.5)])
        .expect("answer");

    let prompt = completer.last_prompt().expect("prompt recorded");
    assert!(prompt.contains("Context:\nTemplates use the {question} placeholder.\n"));
    assert!(prompt.contains("Question:\nWhat is a heap?\n"));
}

#[test]
fn question_text_is_not_expanded() {
    let completer = ScriptedCompleter::new("Answer.");
    let text = record("dsa_c0", Some("Heaps are trees."));

    Composer::new(&completer)
        .answer("Why does {context} appear here?", &[chunk_ref(0, &text, 0.5)])
        .expect("answer");

    let prompt = completer.last_prompt().expect("prompt recorded");
    assert!(prompt.contains("Question:\nWhy does {context} appear here?\n"));
    assert_eq!(prompt.matches("Heaps are trees.").count(), 1);
}

#[test]
fn flashcard_passage_with_braces_is_verbatim() {
    let completer = ScriptedCompleter::new("Question: Q?\nAnswer: A.");
    let text = record("dsa_c0", Some("Format strings look like {passage} or {}."));

    Composer::new(&completer)
        .flashcards(&[chunk_ref(0, &text, 0.5)])
        .expect("flashcards");

    let prompt = completer.last_prompt().expect("prompt recorded");
    assert!(prompt.ends_with("Text:\nFormat strings look like {passage} or {}.\n"));
}
