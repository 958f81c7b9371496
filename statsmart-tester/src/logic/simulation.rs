use statsmart_battle::{EmittedEvent, EncounterSession, Outcome};

use crate::logic::policy::{PlayStrategy, PlayerPolicy, PolicyDecision};

/// Configuration for a simulation session.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub seed: u64,
    pub strategy: PlayStrategy,
    pub max_turns: u32,
    pub stage_retries: u8,
}

impl SimulationConfig {
    #[must_use]
    pub fn new(strategy: PlayStrategy, seed: u64) -> Self {
        Self {
            seed,
            strategy,
            max_turns: 2_000,
            stage_retries: 0,
        }
    }

    #[must_use]
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    #[must_use]
    pub fn with_stage_retries(mut self, stage_retries: u8) -> Self {
        self.stage_retries = stage_retries;
        self
    }
}

/// Snapshot of one answered question.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub turn: u32,
    pub stage: usize,
    pub question_index: usize,
    pub choice_index: usize,
    pub choice_label: String,
    pub correct: bool,
    pub policy_name: String,
    pub rationale: Option<String>,
}

/// What the harness did with one turn.
#[derive(Debug, Clone)]
pub enum TurnAction {
    Answered(DecisionRecord),
    /// The engine ignored the policy's selection.
    Rejected { choice_index: usize },
    /// Time was advanced to the next timer deadline.
    Waited { until_ms: u64 },
    RestartedStage { stage: usize },
    /// Input is open, the policy declined to answer and no timer is pending.
    Stalled,
    Finished(Outcome),
}

impl TurnAction {
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            TurnAction::Answered(decision) => format!(
                "answered {} ({})",
                decision.choice_index,
                if decision.correct { "correct" } else { "wrong" }
            ),
            TurnAction::Rejected { choice_index } => format!("choice {choice_index} rejected"),
            TurnAction::Waited { until_ms } => format!("waited until {until_ms}ms"),
            TurnAction::RestartedStage { stage } => format!("restarted stage {}", stage + 1),
            TurnAction::Stalled => "stalled".to_string(),
            TurnAction::Finished(outcome) => format!("finished: {outcome:?}"),
        }
    }
}

/// Result of advancing the simulation by one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub turn: u32,
    pub at_ms: u64,
    pub action: TurnAction,
    pub events: Vec<EmittedEvent>,
    pub violation: Option<String>,
    pub finished: bool,
}

/// Deterministic harness around one [`EncounterSession`].
///
/// Every turn either answers the open question, waits for the next timer, or
/// handles a terminal outcome. Invariants are checked after each turn.
pub struct SimulationSession {
    session: EncounterSession,
    max_turns: u32,
    retries_left: u8,
    turn: u32,
}

impl SimulationSession {
    #[must_use]
    pub fn new(session: EncounterSession, config: SimulationConfig) -> Self {
        log::debug!(
            "simulating seed {:#x} with {} ({} stage retries)",
            config.seed,
            config.strategy,
            config.stage_retries
        );
        Self {
            session,
            max_turns: config.max_turns,
            retries_left: config.stage_retries,
            turn: 0,
        }
    }

    #[must_use]
    pub fn session(&self) -> &EncounterSession {
        &self.session
    }

    pub fn advance(&mut self, policy: &mut dyn PlayerPolicy) -> TurnOutcome {
        self.turn += 1;
        let action = self.step(policy);
        let events = self.session.drain_events();
        let violation = self
            .session
            .state()
            .verify(self.session.config())
            .err()
            .map(|err| err.to_string());
        let finished = matches!(
            action,
            TurnAction::Finished(_) | TurnAction::Stalled | TurnAction::Rejected { .. }
        ) || self.turn >= self.max_turns;

        TurnOutcome {
            turn: self.turn,
            at_ms: self.session.now_ms(),
            action,
            events,
            violation,
            finished,
        }
    }

    fn step(&mut self, policy: &mut dyn PlayerPolicy) -> TurnAction {
        let state = self.session.state();
        if let Some(outcome) = state.outcome() {
            let stage = state.stage_index;
            if outcome == Outcome::Defeat && self.retries_left > 0 && self.session.restart_stage()
            {
                self.retries_left -= 1;
                policy.on_stage_restart();
                return TurnAction::RestartedStage { stage };
            }
            return TurnAction::Finished(outcome);
        }
        if state.is_input_locked() {
            return self.wait();
        }

        let view = self.session.snapshot();
        let Some(question) = self.session.current_question().cloned() else {
            return TurnAction::Stalled;
        };
        let Some(PolicyDecision {
            choice_index,
            rationale,
        }) = policy.pick_choice(&view, &question)
        else {
            return self.wait();
        };

        if !self.session.select_choice(choice_index) {
            return TurnAction::Rejected { choice_index };
        }
        TurnAction::Answered(DecisionRecord {
            turn: self.turn,
            stage: view.stage_index,
            question_index: view.question_index,
            choice_index,
            choice_label: question
                .choices
                .get(choice_index)
                .cloned()
                .unwrap_or_default(),
            correct: question.is_correct(choice_index),
            policy_name: policy.name().to_string(),
            rationale,
        })
    }

    fn wait(&mut self) -> TurnAction {
        match self.session.next_deadline() {
            Some(until_ms) => {
                self.session.advance_to(until_ms);
                TurnAction::Waited { until_ms }
            }
            None => TurnAction::Stalled,
        }
    }
}
