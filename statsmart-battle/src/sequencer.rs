//! Expands the analysis quiz into one question per point of enemy health.
use crate::data::QuizItem;
use crate::rng::RandomSource;

/// Build the encounter's question sequence.
///
/// Sources at least `total_slots` long are truncated in order. Shorter
/// sources keep their items first and pad with uniform draws, stepping to
/// the next source item when a draw would repeat the previous slot.
#[must_use]
pub fn build_sequence(
    items: &[QuizItem],
    total_slots: usize,
    rng: &mut dyn RandomSource,
) -> Vec<QuizItem> {
    source_positions(items.len(), total_slots, rng)
        .into_iter()
        .filter_map(|idx| items.get(idx).cloned())
        .collect()
}

/// Source position used for every slot of the sequence.
#[must_use]
pub fn source_positions(
    source_len: usize,
    total_slots: usize,
    rng: &mut dyn RandomSource,
) -> Vec<usize> {
    if source_len == 0 {
        return Vec::new();
    }
    if source_len >= total_slots {
        return (0..total_slots).collect();
    }

    let mut positions: Vec<usize> = (0..source_len).collect();
    while positions.len() < total_slots {
        let mut pick = rng.index(source_len);
        if source_len > 1 && positions.last() == Some(&pick) {
            pick = (pick + 1) % source_len;
        }
        positions.push(pick);
    }
    log::debug!(
        "padded {source_len} quiz items to {total_slots} slots ({} drawn)",
        total_slots - source_len
    );
    positions
}
