
use std::path::Path;

use tracing::info;

use super::parser::Flashcard;
use crate::Result;

/// Write `cards` as a `Front,Back` CSV in the order given
#[inline]
pub fn write_flashcards_csv(path: &Path, cards: &[Flashcard]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if cards.is_empty() {
        writer.write_record(["Front", "Back"])?;
    }
    for card in cards {
        writer.serialize(card)?;
    }
    writer.flush()?;

    info!("{} flashcards saved to {}", cards.len(), path.display());
    Ok(())
}
