//! StatSmart Quiz Battle Engine
//!
//! Platform-agnostic core for the quiz battle minigame: turns the quiz items
//! of a stored analysis into a staged combat encounter with health pools,
//! a boss rage countdown and animation-synchronised damage.
//! This crate has no UI or platform-specific dependencies.

pub mod config;
pub mod constants;
pub mod data;
pub mod events;
pub mod numbers;
#[cfg(feature = "async")]
pub mod realtime;
pub mod resolver;
pub mod rng;
pub mod roster;
pub mod sequencer;
pub mod session;
pub mod state;
pub mod store;
pub mod timers;

// Re-export commonly used types
pub use config::{BattleConfig, BattleConfigError, TimingConfig};
pub use data::{Analysis, AnalysisPayload, QuizItem, RankedAnalysis, RecentAnalysis, Variable};
pub use events::{BattleEvent, EmittedEvent, stage_cleared_banner};
pub use resolver::{
    Resolution, ResolverContext, ScheduledStep, StateDelta, Step, resolve_choice,
    resolve_rage_attack,
};
pub use rng::{CountingRng, RandomSource, RngBundle, ScriptedSource};
pub use roster::{
    AnimationClock, AnimationKind, Badge, Combatant, SpriteCatalog, SpriteKey, SpriteSheet,
    UniformClock,
};
pub use sequencer::{build_sequence, source_positions};
pub use session::{ChoiceView, EncounterSession, EncounterSnapshot, QuestionView, QuizAvailability};
pub use state::{DamageBubble, EncounterState, InvariantViolation, Outcome, Phase, RageTimer};
pub use store::{AnalysisStore, MemoryStore, StoreError, merge_recent, record_analysis};
pub use timers::{FiredTimer, TimerHandle, TimerKind, TimerRegistry};

/// Entry point tying a platform store to encounter sessions.
pub struct BattleEngine<S>
where
    S: AnalysisStore,
{
    store: S,
    config: BattleConfig,
}

impl<S> BattleEngine<S>
where
    S: AnalysisStore,
{
    /// Create an engine over `store` using the bundled battle configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: BattleConfig::load_from_static(),
        }
    }

    /// Create an engine over `store` with a caller-supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns the first bound `config` violates.
    pub fn with_config(store: S, config: BattleConfig) -> Result<Self, BattleConfigError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Open an encounter over the stored analysis' quiz.
    ///
    /// A missing payload or an empty quiz yields
    /// [`QuizAvailability::Unavailable`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn open_session(&self, seed: u64) -> Result<QuizAvailability, S::Error> {
        let Some(payload) = self.store.load_analysis()? else {
            log::info!("no stored analysis; quiz unavailable");
            return Ok(QuizAvailability::Unavailable);
        };
        let items = payload.quiz_items();
        log::debug!(
            "opening encounter for {} with {} quiz items (seed {seed:#x})",
            payload.session_id,
            items.len()
        );
        Ok(EncounterSession::seeded(&items, self.config.clone(), seed))
    }

    /// Store a new analysis and fold it into the recent history.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload or history cannot be written.
    pub fn record(&self, payload: &AnalysisPayload, at: i64) -> Result<(), S::Error> {
        record_analysis(&self.store, payload, at)
    }

    /// Recent analyses, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be read.
    pub fn recent(&self) -> Result<Vec<RecentAnalysis>, S::Error> {
        self.store.load_recent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../assets/sample_analysis.json");

    #[test]
    fn engine_without_payload_is_unavailable() {
        let engine = BattleEngine::new(MemoryStore::new());
        let availability = engine.open_session(1).unwrap();
        assert!(!availability.is_available());
    }

    #[test]
    fn engine_opens_session_from_stored_payload() {
        let engine = BattleEngine::new(MemoryStore::new());
        let payload = AnalysisPayload::from_json(SAMPLE).unwrap();
        engine.record(&payload, 1_700_000_000_000).unwrap();

        let session = engine.open_session(0xC0FFEE).unwrap().into_session().unwrap();
        assert_eq!(session.sequence().len(), 17);
        assert_eq!(session.sequence()[0], payload.analysis.quiz[0]);
        assert_eq!(engine.recent().unwrap().len(), 1);
    }

    #[test]
    fn engine_rejects_config_without_stages() {
        let config = BattleConfig {
            stage_health: Vec::new(),
            ..BattleConfig::default()
        };
        let engine = BattleEngine::with_config(MemoryStore::new(), config);
        assert_eq!(engine.err(), Some(BattleConfigError::NoStages));
    }

    #[test]
    fn payload_with_only_invalid_items_is_unavailable() {
        let store = MemoryStore::new();
        store.insert_raw(
            constants::ANALYSIS_KEY,
            r#"{ "sessionId": "bad", "analysis": { "quiz": [
                { "question": "?", "choices": ["a"], "answer": 3 }
            ] } }"#,
        );
        let engine = BattleEngine::new(store);
        assert!(!engine.open_session(5).unwrap().is_available());
    }
}
