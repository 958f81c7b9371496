use serde::{Deserialize, Serialize};

use crate::roster::{AnimationKind, Combatant, SpriteKey};
use crate::state::Outcome;

/// Instructions for the presentation layer, emitted in playback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleEvent {
    /// Start a sprite animation; `duration_ms` is zero for looping idles.
    Animation {
        target: Combatant,
        sprite: SpriteKey,
        kind: AnimationKind,
        duration_ms: u64,
    },
    DamageBubble {
        target: Combatant,
        amount: u8,
        lifetime_ms: u64,
    },
    DamageBubbleCleared {
        target: Combatant,
    },
    ChoiceResult {
        question_index: usize,
        choice: usize,
        correct: bool,
    },
    ShieldAbsorbed {
        choice: usize,
    },
    StageCleared {
        stage: usize,
        banner: String,
    },
    StageEntered {
        stage: usize,
        enemy: SpriteKey,
        health: u8,
    },
    BossIntroCountdown {
        remaining: u8,
    },
    RageStarted {
        window_ms: u64,
    },
    RageCancelled,
    RageUnleashed {
        damage: u8,
    },
    OutcomeReached {
        outcome: Outcome,
    },
}

/// An event stamped with the session clock at which it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: BattleEvent,
}

/// Banner shown while the next stage loads; stages are numbered from one.
#[must_use]
pub fn stage_cleared_banner(stage: usize) -> String {
    format!("Stage {} Cleared!", stage + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialise_with_type_tag() {
        let emitted = EmittedEvent {
            at_ms: 375,
            event: BattleEvent::Animation {
                target: Combatant::Enemy,
                sprite: SpriteKey::Orc,
                kind: AnimationKind::Hurt,
                duration_ms: 500,
            },
        };
        let json = serde_json::to_value(&emitted).unwrap();
        assert_eq!(json["type"], "animation");
        assert_eq!(json["at_ms"], 375);
        assert_eq!(json["kind"], "hurt");
        assert_eq!(json["sprite"], "orc");
    }

    #[test]
    fn banner_numbers_from_one() {
        assert_eq!(stage_cleared_banner(0), "Stage 1 Cleared!");
        assert_eq!(stage_cleared_banner(5), "Stage 6 Cleared!");
    }
}
