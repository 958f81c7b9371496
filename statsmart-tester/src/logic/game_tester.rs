use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use statsmart_battle::{
    Analysis, AnalysisPayload, BattleConfig, BattleEngine, BattleEvent, EncounterSnapshot,
    MemoryStore, Outcome, QuizItem,
};

use crate::logic::policy::PlayStrategy;
use crate::logic::simulation::{
    DecisionRecord, SimulationConfig, SimulationSession, TurnAction, TurnOutcome,
};

const SAMPLE_ANALYSIS: &str = include_str!("../../../statsmart-battle/assets/sample_analysis.json");

/// Analysis payload and battle configuration shared by every run.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    pub payload: AnalysisPayload,
    pub config: BattleConfig,
}

impl TesterAssets {
    /// Bundled sample analysis with the bundled battle configuration.
    #[must_use]
    pub fn load_default() -> Self {
        let payload = AnalysisPayload::from_json(SAMPLE_ANALYSIS).unwrap_or_else(|err| {
            log::warn!("bundled sample analysis failed to parse: {err}");
            AnalysisPayload {
                session_id: "empty".to_string(),
                analysis: Analysis::default(),
            }
        });
        Self {
            payload,
            config: BattleConfig::load_from_static(),
        }
    }

    /// Read an analysis payload from disk.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or is not a payload.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let payload = AnalysisPayload::from_json(&raw)
            .with_context(|| format!("failed to parse analysis payload {}", path.display()))?;
        Ok(Self {
            payload,
            config: BattleConfig::load_from_static(),
        })
    }
}

/// Declarative plan for running a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: PlayStrategy,
    pub max_turns: Option<u32>,
    pub stage_retries: u8,
    /// Keep only the first N quiz items of the payload.
    pub quiz_limit: Option<usize>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(strategy: PlayStrategy) -> Self {
        Self {
            strategy,
            max_turns: None,
            stage_retries: 0,
            quiz_limit: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    #[must_use]
    pub const fn with_stage_retries(mut self, stage_retries: u8) -> Self {
        self.stage_retries = stage_retries;
        self
    }

    #[must_use]
    pub const fn with_quiz_limit(mut self, limit: usize) -> Self {
        self.quiz_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Counters gathered while a run plays out.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub correct_answers: usize,
    pub wrong_answers: usize,
    pub restarts: usize,
    pub stages_cleared: usize,
    pub rage_attacks: usize,
    pub rage_cancellations: usize,
    pub max_stage_reached: usize,
    pub simulated_ms: u64,
    pub invariant_violations: Vec<String>,
    pub decision_log: Vec<DecisionRecord>,
}

impl RunMetrics {
    pub fn record_turn(&mut self, outcome: &TurnOutcome) {
        match &outcome.action {
            TurnAction::Answered(decision) => {
                if decision.correct {
                    self.correct_answers += 1;
                } else {
                    self.wrong_answers += 1;
                }
                self.max_stage_reached = self.max_stage_reached.max(decision.stage);
                self.decision_log.push(decision.clone());
            }
            TurnAction::RestartedStage { .. } => self.restarts += 1,
            _ => {}
        }
        for emitted in &outcome.events {
            match emitted.event {
                BattleEvent::StageCleared { .. } => self.stages_cleared += 1,
                BattleEvent::RageUnleashed { .. } => self.rage_attacks += 1,
                BattleEvent::RageCancelled => self.rage_cancellations += 1,
                BattleEvent::StageEntered { stage, .. } => {
                    self.max_stage_reached = self.max_stage_reached.max(stage);
                }
                _ => {}
            }
        }
        if let Some(violation) = &outcome.violation {
            self.invariant_violations
                .push(format!("turn {}: {violation}", outcome.turn));
        }
        self.simulated_ms = outcome.at_ms;
    }
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: PlayStrategy,
    pub config: BattleConfig,
    /// `false` when the payload produced no playable quiz.
    pub available: bool,
    pub source_items: Vec<QuizItem>,
    pub sequence: Vec<QuizItem>,
    pub turns: Vec<TurnOutcome>,
    pub metrics: RunMetrics,
    pub outcome: Option<Outcome>,
    pub final_view: Option<EncounterSnapshot>,
    pub ending_message: String,
}

impl SimulationSummary {
    fn unavailable(seed: u64, plan: &SimulationPlan, config: BattleConfig) -> Self {
        Self {
            seed,
            strategy: plan.strategy,
            config,
            available: false,
            source_items: Vec::new(),
            sequence: Vec::new(),
            turns: Vec::new(),
            metrics: RunMetrics::default(),
            outcome: None,
            final_view: None,
            ending_message: "No quiz available".to_string(),
        }
    }

    #[must_use]
    pub fn final_lives(&self) -> Option<u8> {
        self.final_view.as_ref().map(|view| view.player_lives)
    }

    #[must_use]
    pub fn halted(&self) -> bool {
        self.available && self.outcome.is_none()
    }
}

/// Drives engine sessions through a [`SimulationPlan`].
#[derive(Debug, Clone)]
pub struct GameTester {
    assets: Arc<TesterAssets>,
    verbose: bool,
}

impl GameTester {
    #[must_use]
    pub fn new(assets: Arc<TesterAssets>, verbose: bool) -> Self {
        Self { assets, verbose }
    }

    /// Store the plan's payload, open a session for `seed` and play it out.
    ///
    /// # Errors
    ///
    /// Returns an error if the battle configuration is out of bounds or the
    /// in-memory store rejects the payload.
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let mut payload = self.assets.payload.clone();
        if let Some(limit) = plan.quiz_limit {
            payload.analysis.quiz.truncate(limit);
        }
        let config = self.assets.config.clone();
        let engine = BattleEngine::with_config(MemoryStore::new(), config.clone())
            .context("battle configuration rejected")?;
        engine
            .record(&payload, Utc::now().timestamp_millis())
            .context("failed to store analysis payload")?;
        let availability = engine
            .open_session(seed)
            .context("failed to read stored analysis")?;

        let Some(session) = availability.into_session() else {
            if self.verbose {
                println!("🚫 seed:{seed} payload has no playable quiz");
            }
            return Ok(SimulationSummary::unavailable(seed, plan, config));
        };
        let source_items = payload.quiz_items();
        let sequence = session.sequence().to_vec();

        if self.verbose {
            log_initial_state(seed, plan, &session.snapshot());
        }

        let mut sim_config =
            SimulationConfig::new(plan.strategy, seed).with_stage_retries(plan.stage_retries);
        if let Some(max_turns) = plan.max_turns {
            sim_config = sim_config.with_max_turns(max_turns);
        }
        let mut sim = SimulationSession::new(session, sim_config);
        let mut policy = plan.strategy.create_policy(seed);
        let mut metrics = RunMetrics::default();
        let mut turns = Vec::new();

        loop {
            let outcome = sim.advance(policy.as_mut());
            metrics.record_turn(&outcome);

            if self.verbose {
                log_turn(&outcome);
            }

            let finished = outcome.finished;
            turns.push(outcome);
            if finished {
                break;
            }
        }

        let outcome = sim.session().state().outcome();
        let final_view = sim.session().snapshot();
        let ending_message = match outcome {
            Some(Outcome::Victory) => "Victory".to_string(),
            Some(Outcome::Defeat) => "Defeat".to_string(),
            None => turns
                .last()
                .map_or_else(|| "not started".to_string(), |turn| turn.action.label()),
        };

        Ok(SimulationSummary {
            seed,
            strategy: plan.strategy,
            config,
            available: true,
            source_items,
            sequence,
            turns,
            metrics,
            outcome,
            final_view: Some(final_view),
            ending_message,
        })
    }
}

fn log_initial_state(seed: u64, plan: &SimulationPlan, view: &EncounterSnapshot) {
    println!(
        "🎮 Starting simulation | seed:{seed} policy:{} questions:{}",
        plan.strategy, view.question_count
    );
    println!(
        "📊 Initial state | Lives:{} Stage:{}/{} Enemy:{}",
        view.player_lives,
        view.stage_index + 1,
        view.stage_count,
        view.enemy_name
    );
}

fn log_turn(outcome: &TurnOutcome) {
    if let TurnAction::Answered(decision) = &outcome.action {
        let mark = if decision.correct { "✔" } else { "✘" };
        println!(
            "  {mark} t={}ms stage {} q{} -> {} '{}'",
            outcome.at_ms,
            decision.stage + 1,
            decision.question_index + 1,
            decision.choice_index,
            decision.choice_label
        );
    }
    for emitted in &outcome.events {
        match &emitted.event {
            BattleEvent::StageCleared { banner, .. } => println!("  🏳 {banner}"),
            BattleEvent::RageUnleashed { damage } => {
                println!("  🔥 t={}ms rage unleashed for {damage}", emitted.at_ms);
            }
            BattleEvent::OutcomeReached { outcome } => println!("  🏁 {outcome:?}"),
            _ => {}
        }
    }
    if let Some(violation) = &outcome.violation {
        println!("  ⚠️  invariant violated: {violation}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester() -> GameTester {
        GameTester::new(Arc::new(TesterAssets::load_default()), false)
    }

    #[test]
    fn default_assets_carry_a_playable_quiz() {
        let assets = TesterAssets::load_default();
        assert!(!assets.payload.quiz_items().is_empty());
        assert_eq!(assets.config, BattleConfig::default());
    }

    #[test]
    fn perfect_plan_records_every_answer() {
        let summary = tester()
            .run_plan(&SimulationPlan::new(PlayStrategy::Perfect), 7)
            .unwrap();
        assert!(summary.available);
        assert_eq!(summary.outcome, Some(Outcome::Victory));
        assert_eq!(summary.metrics.correct_answers, 17);
        assert_eq!(summary.metrics.wrong_answers, 0);
        assert_eq!(summary.metrics.stages_cleared, 6);
        assert_eq!(summary.metrics.max_stage_reached, 6);
        assert!(summary.metrics.invariant_violations.is_empty());
        assert_eq!(summary.final_lives(), Some(5));
        assert!(!summary.halted());
    }

    #[test]
    fn empty_quiz_limit_is_unavailable() {
        let summary = tester()
            .run_plan(&SimulationPlan::new(PlayStrategy::Perfect).with_quiz_limit(0), 7)
            .unwrap();
        assert!(!summary.available);
        assert!(summary.turns.is_empty());
        assert!(!summary.halted());
    }

    #[test]
    fn out_of_bounds_config_fails_the_run() {
        let mut assets = TesterAssets::load_default();
        assets.config.stage_health.clear();
        let tester = GameTester::new(Arc::new(assets), false);
        let err = tester
            .run_plan(&SimulationPlan::new(PlayStrategy::Perfect), 1)
            .unwrap_err();
        assert!(err.to_string().contains("battle configuration rejected"));
    }

    #[test]
    fn missing_analysis_file_is_an_error() {
        let err = TesterAssets::from_path(Path::new("/nonexistent/analysis.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn expectations_see_the_summary() {
        let plan = SimulationPlan::new(PlayStrategy::Perfect).with_expectation(
            |summary: &SimulationSummary| {
                anyhow::ensure!(summary.seed == 3, "unexpected seed");
                Ok(())
            },
        );
        let summary = tester().run_plan(&plan, 3).unwrap();
        assert!(plan.expectations[0].evaluate(&summary).is_ok());
    }
}
