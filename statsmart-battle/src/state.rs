//! Encounter state and the explicit phase machine behind it.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::config::BattleConfig;
use crate::numbers::unit_ratio;
use crate::roster::{AnimationKind, Combatant};

/// Terminal result of an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Victory,
    Defeat,
}

/// Boss rage countdown while the encounter is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "rage", rename_all = "snake_case")]
pub enum RageTimer {
    #[default]
    Idle,
    Counting {
        started_at_ms: u64,
        /// Elapsed time observed at the last progress tick.
        sampled_elapsed_ms: u64,
    },
}

/// Where the encounter currently is; rendering flags derive from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    InProgress { rage: RageTimer },
    StageTransition { cleared_stage: usize },
    BossIntro { countdown: u8 },
    /// The rage window expired; the automatic special attack is in flight.
    RageArmed,
    Victory,
    Defeat,
}

impl Phase {
    pub(crate) const fn in_progress() -> Self {
        Self::InProgress {
            rage: RageTimer::Idle,
        }
    }
}

/// Damage number floating over a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageBubble {
    pub target: Combatant,
    pub amount: u8,
    pub shown_at_ms: u64,
}

/// Mutable root of one encounter. Only the resolver and the session's
/// timer handling write to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterState {
    pub player_lives: u8,
    pub stage_index: usize,
    pub stage_health: u8,
    pub question_index: usize,
    pub disabled_choices: SmallVec<[usize; 4]>,
    /// Set while a resolution is in flight; phases may lock on top of it.
    pub input_locked: bool,
    pub phase: Phase,
    /// Latched once the rage attack fires in the current boss engagement.
    pub rage_performed: bool,
    /// Legacy shield charge; nothing grants it in normal play.
    pub shield_remaining: u8,
    pub player_animation: AnimationKind,
    pub enemy_animation: AnimationKind,
    pub damage_bubble: Option<DamageBubble>,
    pub banner: Option<String>,
}

impl EncounterState {
    /// State for a brand new encounter at stage zero.
    #[must_use]
    pub fn fresh(cfg: &BattleConfig) -> Self {
        let mut state = Self {
            player_lives: cfg.starting_lives,
            stage_index: 0,
            stage_health: 0,
            question_index: 0,
            disabled_choices: SmallVec::new(),
            input_locked: false,
            phase: Phase::in_progress(),
            rage_performed: false,
            shield_remaining: 0,
            player_animation: AnimationKind::Idle,
            enemy_animation: AnimationKind::Idle,
            damage_bubble: None,
            banner: None,
        };
        state.enter_stage(cfg, 0);
        state
    }

    /// Reset to the start of `stage` with the reduced restart life pool.
    pub(crate) fn restart_at_stage(&mut self, cfg: &BattleConfig, stage: usize) {
        self.player_lives = cfg.restart_stage_lives;
        self.question_index = cfg.first_question_of_stage(stage);
        self.input_locked = false;
        self.player_animation = AnimationKind::Idle;
        self.damage_bubble = None;
        self.enter_stage(cfg, stage);
    }

    /// Load a stage's enemy; the boss stage opens on its intro countdown.
    pub(crate) fn enter_stage(&mut self, cfg: &BattleConfig, stage: usize) {
        self.stage_index = stage;
        self.stage_health = cfg.stage_max_health(stage);
        self.disabled_choices.clear();
        self.shield_remaining = 0;
        self.enemy_animation = AnimationKind::Idle;
        self.banner = None;
        self.rage_performed = false;
        self.phase = if cfg.is_boss_stage(stage) {
            Phase::BossIntro {
                countdown: cfg.timing.boss_intro_seconds,
            }
        } else {
            Phase::in_progress()
        };
    }

    /// Move to the next question, clamped to the last slot.
    pub(crate) fn advance_question(&mut self, sequence_len: usize) {
        self.question_index = (self.question_index + 1).min(sequence_len.saturating_sub(1));
        self.disabled_choices.clear();
    }

    pub(crate) fn disable_choice(&mut self, choice: usize) {
        if !self.disabled_choices.contains(&choice) {
            self.disabled_choices.push(choice);
        }
    }

    #[must_use]
    pub fn is_choice_disabled(&self, choice: usize) -> bool {
        self.disabled_choices.contains(&choice)
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Victory => Some(Outcome::Victory),
            Phase::Defeat => Some(Outcome::Defeat),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// Whether a choice selection would currently be rejected.
    #[must_use]
    pub const fn is_input_locked(&self) -> bool {
        self.input_locked || !matches!(self.phase, Phase::InProgress { .. })
    }

    #[must_use]
    pub const fn boss_intro_active(&self) -> bool {
        matches!(self.phase, Phase::BossIntro { .. })
    }

    #[must_use]
    pub const fn boss_intro_countdown(&self) -> Option<u8> {
        match self.phase {
            Phase::BossIntro { countdown } => Some(countdown),
            _ => None,
        }
    }

    #[must_use]
    pub const fn rage_timer_visible(&self) -> bool {
        matches!(
            self.phase,
            Phase::InProgress {
                rage: RageTimer::Counting { .. }
            }
        )
    }

    #[must_use]
    pub const fn rage_armed(&self) -> bool {
        matches!(self.phase, Phase::RageArmed)
    }

    /// Remaining share of the rage window, 1 at start and 0 when it expires.
    #[must_use]
    pub fn rage_progress(&self, window_ms: u64) -> f32 {
        match self.phase {
            Phase::InProgress {
                rage: RageTimer::Counting {
                    sampled_elapsed_ms, ..
                },
            } => 1.0 - unit_ratio(sampled_elapsed_ms, window_ms),
            _ => 0.0,
        }
    }

    /// Check every structural invariant against `cfg`.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn verify(&self, cfg: &BattleConfig) -> Result<(), InvariantViolation> {
        if self.stage_index >= cfg.stage_count() {
            return Err(InvariantViolation::StageOutOfRange {
                stage: self.stage_index,
                count: cfg.stage_count(),
            });
        }
        let max = cfg.stage_max_health(self.stage_index);
        if self.stage_health > max {
            return Err(InvariantViolation::HealthOutOfRange {
                stage: self.stage_index,
                health: self.stage_health,
                max,
            });
        }
        if self.player_lives > cfg.starting_lives {
            return Err(InvariantViolation::LivesOutOfRange {
                lives: self.player_lives,
                max: cfg.starting_lives,
            });
        }
        match self.phase {
            Phase::Defeat if self.player_lives != 0 => {
                return Err(InvariantViolation::DefeatWithLives {
                    lives: self.player_lives,
                });
            }
            Phase::Victory if !cfg.is_boss_stage(self.stage_index) || self.stage_health != 0 => {
                return Err(InvariantViolation::PrematureVictory {
                    stage: self.stage_index,
                    health: self.stage_health,
                });
            }
            Phase::BossIntro { .. } | Phase::RageArmed
                if !cfg.is_boss_stage(self.stage_index) =>
            {
                return Err(InvariantViolation::BossStateOffBossStage {
                    stage: self.stage_index,
                });
            }
            Phase::InProgress {
                rage: RageTimer::Counting { .. },
            } if !cfg.is_boss_stage(self.stage_index) => {
                return Err(InvariantViolation::BossStateOffBossStage {
                    stage: self.stage_index,
                });
            }
            _ => {}
        }
        if self.player_lives == 0 && !self.is_input_locked() {
            return Err(InvariantViolation::UnlockedWithoutLives);
        }
        Ok(())
    }
}

/// A broken structural invariant of [`EncounterState`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("stage {stage} is outside the {count}-stage layout")]
    StageOutOfRange { stage: usize, count: usize },
    #[error("stage {stage} health {health} exceeds its maximum {max}")]
    HealthOutOfRange { stage: usize, health: u8, max: u8 },
    #[error("player lives {lives} exceed the maximum {max}")]
    LivesOutOfRange { lives: u8, max: u8 },
    #[error("defeat declared with {lives} lives remaining")]
    DefeatWithLives { lives: u8 },
    #[error("victory declared at stage {stage} with {health} health remaining")]
    PrematureVictory { stage: usize, health: u8 },
    #[error("boss-only state active on stage {stage}")]
    BossStateOffBossStage { stage: usize },
    #[error("input accepted after the player ran out of lives")]
    UnlockedWithoutLives,
}
