//! Centralized balance and timing constants for the quiz battle.
//!
//! These values back `BattleConfig::default()` and mirror the bundled
//! `assets/battle.json`. Gameplay only changes through reviewed edits here
//! or an explicit configuration override.

// Encounter layout ---------------------------------------------------------
pub(crate) const STAGE_HEALTH: [u8; 7] = [1, 1, 3, 2, 2, 3, 5];
pub(crate) const STARTING_LIVES: u8 = 5;
pub(crate) const RESTART_STAGE_LIVES: u8 = 1;
pub(crate) const SHIELD_STAGE: usize = 2;

// Damage -------------------------------------------------------------------
pub(crate) const ENEMY_ATTACK_DAMAGE: u8 = 1;
pub(crate) const BOSS_SPECIAL_DAMAGE: u8 = 4;
pub(crate) const PLAYER_ATTACK_DAMAGE: u8 = 1;

// Timing (milliseconds) ----------------------------------------------------
pub(crate) const STAGE_BANNER_MS: u64 = 1_500;
pub(crate) const BOSS_INTRO_SECONDS: u8 = 5;
pub(crate) const BOSS_INTRO_TICK_MS: u64 = 1_000;
pub(crate) const RAGE_WINDOW_MS: u64 = 15_000;
pub(crate) const RAGE_TICK_MS: u64 = 100;
pub(crate) const DAMAGE_BUBBLE_MS: u64 = 420;
pub(crate) const HURT_TO_DEATH_GAP_MS: u64 = 200;
pub(crate) const DEATH_LINGER_MS: u64 = 1_000;

// Persistent store keys ----------------------------------------------------
pub const ANALYSIS_KEY: &str = "statsmart:analysis";
pub const RECENT_KEY: &str = "statsmart:recent";
pub const RECENT_CAPACITY: usize = 3;
