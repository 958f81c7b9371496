//! Battle tuning configuration
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    BOSS_INTRO_SECONDS, BOSS_INTRO_TICK_MS, BOSS_SPECIAL_DAMAGE, DAMAGE_BUBBLE_MS,
    DEATH_LINGER_MS, ENEMY_ATTACK_DAMAGE, HURT_TO_DEATH_GAP_MS, PLAYER_ATTACK_DAMAGE,
    RAGE_TICK_MS, RAGE_WINDOW_MS, RESTART_STAGE_LIVES, SHIELD_STAGE, STAGE_BANNER_MS,
    STAGE_HEALTH, STARTING_LIVES,
};

const DEFAULT_BATTLE_DATA: &str = include_str!("../assets/battle.json");

/// Errors raised when battle configuration invariants are violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BattleConfigError {
    #[error("at least one stage is required")]
    NoStages,
    #[error("stage {stage} must have at least 1 health")]
    EmptyStage { stage: usize },
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: u64,
        value: u64,
    },
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: &'static str,
        min: u64,
        max: u64,
        value: u64,
    },
    #[error("restart lives {restart} exceed starting lives {starting}")]
    RestartLivesExceedStart { restart: u8, starting: u8 },
}

/// Countdown and animation pacing, all in milliseconds unless noted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub stage_banner_ms: u64,
    /// Whole seconds shown on the boss intro countdown.
    pub boss_intro_seconds: u8,
    pub boss_intro_tick_ms: u64,
    pub rage_window_ms: u64,
    pub rage_tick_ms: u64,
    pub damage_bubble_ms: u64,
    pub hurt_to_death_gap_ms: u64,
    /// Extra time a death animation stays on screen before the outcome lands.
    pub death_linger_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            stage_banner_ms: STAGE_BANNER_MS,
            boss_intro_seconds: BOSS_INTRO_SECONDS,
            boss_intro_tick_ms: BOSS_INTRO_TICK_MS,
            rage_window_ms: RAGE_WINDOW_MS,
            rage_tick_ms: RAGE_TICK_MS,
            damage_bubble_ms: DAMAGE_BUBBLE_MS,
            hurt_to_death_gap_ms: HURT_TO_DEATH_GAP_MS,
            death_linger_ms: DEATH_LINGER_MS,
        }
    }
}

impl TimingConfig {
    fn validate(&self) -> Result<(), BattleConfigError> {
        require_min("timing.boss_intro_tick_ms", self.boss_intro_tick_ms, 1)?;
        require_min("timing.rage_tick_ms", self.rage_tick_ms, 1)?;
        require_min(
            "timing.rage_window_ms",
            self.rage_window_ms,
            self.rage_tick_ms,
        )?;
        require_range(
            "timing.boss_intro_seconds",
            u64::from(self.boss_intro_seconds),
            1,
            60,
        )?;
        Ok(())
    }
}

/// Static description of the encounter: stages, lives, damage and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Enemy health per stage; the last stage is the boss.
    pub stage_health: Vec<u8>,
    pub starting_lives: u8,
    pub restart_stage_lives: u8,
    pub enemy_attack_damage: u8,
    pub boss_special_damage: u8,
    pub player_attack_damage: u8,
    /// Stage where the legacy shield counter is honoured.
    pub shield_stage: Option<usize>,
    pub timing: TimingConfig,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            stage_health: STAGE_HEALTH.to_vec(),
            starting_lives: STARTING_LIVES,
            restart_stage_lives: RESTART_STAGE_LIVES,
            enemy_attack_damage: ENEMY_ATTACK_DAMAGE,
            boss_special_damage: BOSS_SPECIAL_DAMAGE,
            player_attack_damage: PLAYER_ATTACK_DAMAGE,
            shield_stage: Some(SHIELD_STAGE),
            timing: TimingConfig::default(),
        }
    }
}

impl BattleConfig {
    /// Parse the bundled `battle.json`, falling back to the compiled defaults.
    #[must_use]
    pub fn load_from_static() -> Self {
        match Self::from_json(DEFAULT_BATTLE_DATA) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("bundled battle config rejected, using defaults: {err}");
                Self::default()
            }
        }
    }

    /// Parse and validate a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON is malformed or any bound is violated.
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `BattleConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), BattleConfigError> {
        if self.stage_health.is_empty() {
            return Err(BattleConfigError::NoStages);
        }
        if let Some(stage) = self.stage_health.iter().position(|hp| *hp == 0) {
            return Err(BattleConfigError::EmptyStage { stage });
        }
        require_range(
            "starting_lives",
            u64::from(self.starting_lives),
            1,
            u64::from(u8::MAX),
        )?;
        require_min(
            "restart_stage_lives",
            u64::from(self.restart_stage_lives),
            1,
        )?;
        if self.restart_stage_lives > self.starting_lives {
            return Err(BattleConfigError::RestartLivesExceedStart {
                restart: self.restart_stage_lives,
                starting: self.starting_lives,
            });
        }
        require_min(
            "enemy_attack_damage",
            u64::from(self.enemy_attack_damage),
            1,
        )?;
        require_min(
            "boss_special_damage",
            u64::from(self.boss_special_damage),
            1,
        )?;
        require_min(
            "player_attack_damage",
            u64::from(self.player_attack_damage),
            1,
        )?;
        self.timing.validate()
    }

    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stage_health.len()
    }

    /// Index of the final (boss) stage.
    #[must_use]
    pub fn boss_stage(&self) -> usize {
        self.stage_count().saturating_sub(1)
    }

    #[must_use]
    pub fn is_boss_stage(&self, stage: usize) -> bool {
        stage == self.boss_stage()
    }

    #[must_use]
    pub fn stage_max_health(&self, stage: usize) -> u8 {
        self.stage_health.get(stage).copied().unwrap_or(0)
    }

    /// Sum of every stage's health; one question slot per point.
    #[must_use]
    pub fn total_health(&self) -> usize {
        self.stage_health.iter().map(|hp| usize::from(*hp)).sum()
    }

    /// Position of the first question belonging to `stage`.
    #[must_use]
    pub fn first_question_of_stage(&self, stage: usize) -> usize {
        self.stage_health
            .iter()
            .take(stage)
            .map(|hp| usize::from(*hp))
            .sum()
    }

    #[must_use]
    pub fn shield_applies(&self, stage: usize) -> bool {
        self.shield_stage == Some(stage)
    }
}

fn require_min(field: &'static str, value: u64, min: u64) -> Result<(), BattleConfigError> {
    if value < min {
        return Err(BattleConfigError::MinViolation { field, min, value });
    }
    Ok(())
}

fn require_range(
    field: &'static str,
    value: u64,
    min: u64,
    max: u64,
) -> Result<(), BattleConfigError> {
    if !(min..=max).contains(&value) {
        return Err(BattleConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_config_matches_compiled_defaults() {
        assert_eq!(BattleConfig::load_from_static(), BattleConfig::default());
    }

    #[test]
    fn default_layout_totals_seventeen() {
        let cfg = BattleConfig::default();
        assert_eq!(cfg.stage_count(), 7);
        assert_eq!(cfg.total_health(), 17);
        assert_eq!(cfg.boss_stage(), 6);
        assert_eq!(cfg.first_question_of_stage(0), 0);
        assert_eq!(cfg.first_question_of_stage(3), 5);
        assert_eq!(cfg.first_question_of_stage(6), 12);
        assert!(cfg.shield_applies(2));
        assert!(!cfg.shield_applies(3));
    }

    #[test]
    fn partial_documents_fill_from_defaults() {
        let cfg = BattleConfig::from_json(r#"{ "stage_health": [2, 4] }"#).unwrap();
        assert_eq!(cfg.stage_health, vec![2, 4]);
        assert_eq!(cfg.starting_lives, 5);
        assert_eq!(cfg.timing.rage_window_ms, 15_000);
        assert!(cfg.is_boss_stage(1));
    }

    #[test]
    fn validation_rejects_broken_layouts() {
        let mut cfg = BattleConfig::default();
        cfg.stage_health.clear();
        assert_eq!(cfg.validate(), Err(BattleConfigError::NoStages));

        let mut cfg = BattleConfig::default();
        cfg.stage_health[4] = 0;
        assert_eq!(cfg.validate(), Err(BattleConfigError::EmptyStage { stage: 4 }));

        let mut cfg = BattleConfig::default();
        cfg.restart_stage_lives = 9;
        assert!(matches!(
            cfg.validate(),
            Err(BattleConfigError::RestartLivesExceedStart { .. })
        ));

        let mut cfg = BattleConfig::default();
        cfg.timing.rage_tick_ms = 0;
        assert!(matches!(
            cfg.validate(),
            Err(BattleConfigError::MinViolation {
                field: "timing.rage_tick_ms",
                ..
            })
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(BattleConfig::from_json("{ not json").is_err());
        assert!(BattleConfig::from_json(r#"{ "starting_lives": 0 }"#).is_err());
    }
}
