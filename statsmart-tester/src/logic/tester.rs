use colored::Colorize;
use serde::{Deserialize, Serialize};
use statsmart_battle::Outcome;
use statsmart_battle::numbers::millis_to_u64;
use std::time::Instant;

use crate::logic::game_tester::{GameTester, SimulationSummary};
use crate::scenarios::TestScenario;

/// What one simulated battle did, as the report writers see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRun {
    pub seed: u64,
    /// `None` when no quiz was playable or the turn budget ran out.
    pub outcome: Option<Outcome>,
    pub final_lives: Option<u8>,
    pub stages_cleared: usize,
    pub restarts: usize,
    pub rage_attacks: usize,
    pub rage_cancellations: usize,
    pub invariant_violations: usize,
    pub turns: usize,
    pub simulated_ms: u64,
    pub wall_ms: u64,
    pub failure: Option<String>,
}

impl BattleRun {
    fn from_summary(summary: &SimulationSummary, wall_ms: u64, failure: Option<String>) -> Self {
        let metrics = &summary.metrics;
        Self {
            seed: summary.seed,
            outcome: summary.outcome,
            final_lives: summary.final_lives(),
            stages_cleared: metrics.stages_cleared,
            restarts: metrics.restarts,
            rage_attacks: metrics.rage_attacks,
            rage_cancellations: metrics.rage_cancellations,
            invariant_violations: metrics.invariant_violations.len(),
            turns: summary.turns.len(),
            simulated_ms: metrics.simulated_ms,
            wall_ms,
            failure,
        }
    }

    fn errored(seed: u64, wall_ms: u64, failure: String) -> Self {
        Self {
            seed,
            outcome: None,
            final_lives: None,
            stages_cleared: 0,
            restarts: 0,
            rage_attacks: 0,
            rage_cancellations: 0,
            invariant_violations: 0,
            turns: 0,
            simulated_ms: 0,
            wall_ms,
            failure: Some(failure),
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Every run of one scenario for one base seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_key: String,
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub runs: Vec<BattleRun>,
}

impl ScenarioResult {
    #[must_use]
    pub fn new(scenario: &TestScenario, seed: u64, runs: Vec<BattleRun>) -> Self {
        Self {
            scenario_key: scenario.key.to_string(),
            scenario_name: scenario.name.to_string(),
            seed,
            passed: runs.iter().all(BattleRun::passed),
            runs,
        }
    }

    #[must_use]
    pub fn successful_runs(&self) -> usize {
        self.runs.iter().filter(|run| run.passed()).count()
    }

    /// Failure messages prefixed with the run number and seed.
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.runs
            .iter()
            .enumerate()
            .filter_map(|(idx, run)| {
                run.failure
                    .as_ref()
                    .map(|failure| format!("run {} (seed {}): {failure}", idx + 1, run.seed))
            })
            .collect()
    }

    #[must_use]
    pub fn average_wall_ms(&self) -> u64 {
        let total: u64 = self.runs.iter().map(|run| run.wall_ms).sum();
        total / u64::try_from(self.runs.len()).unwrap_or(u64::MAX).max(1)
    }

    /// e.g. `victory 2 / defeat 1 / unresolved 0`.
    #[must_use]
    pub fn outcome_tally(&self) -> String {
        let count = |wanted: Option<Outcome>| {
            self.runs
                .iter()
                .filter(|run| run.outcome == wanted)
                .count()
        };
        format!(
            "victory {} / defeat {} / unresolved {}",
            count(Some(Outcome::Victory)),
            count(Some(Outcome::Defeat)),
            count(None)
        )
    }

    #[must_use]
    pub fn rage_attacks(&self) -> usize {
        self.runs.iter().map(|run| run.rage_attacks).sum()
    }

    #[must_use]
    pub fn invariant_violations(&self) -> usize {
        self.runs.iter().map(|run| run.invariant_violations).sum()
    }
}

/// Runs catalog scenarios over a seed list.
pub struct LogicTester {
    tester: GameTester,
    verbose: bool,
}

impl LogicTester {
    pub fn new(tester: GameTester, verbose: bool) -> Self {
        Self { tester, verbose }
    }

    /// One [`ScenarioResult`] per seed; run `i` of a seed plays `seed + i`.
    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                if self.verbose {
                    println!(
                        "🧪 {} [{}] seed {seed}",
                        scenario.name.bright_white(),
                        scenario.plan.strategy
                    );
                }
                let runs = (0..iterations)
                    .map(|i| {
                        let offset = u64::try_from(i).unwrap_or(u64::MAX);
                        self.play(scenario, seed.wrapping_add(offset))
                    })
                    .collect();
                ScenarioResult::new(scenario, seed, runs)
            })
            .collect()
    }

    fn play(&self, scenario: &TestScenario, seed: u64) -> BattleRun {
        let started = Instant::now();
        let summary = self.tester.run_plan(&scenario.plan, seed);
        let wall_ms = millis_to_u64(started.elapsed().as_millis());

        let run = match summary {
            Ok(summary) => {
                let failure = scenario
                    .plan
                    .expectations
                    .iter()
                    .find_map(|expectation| expectation.evaluate(&summary).err())
                    .map(|err| format!("{err} | {}", recent_decisions(&summary)));
                BattleRun::from_summary(&summary, wall_ms, failure)
            }
            Err(err) => BattleRun::errored(seed, wall_ms, format!("{err:#}")),
        };

        if self.verbose {
            let outcome = run
                .outcome
                .map_or_else(|| "unresolved".to_string(), |o| format!("{o:?}"));
            match &run.failure {
                None => println!(
                    "  ✅ seed {seed}: {outcome} in {} turns, {}ms simulated, rage {} struck {} cancelled",
                    run.turns, run.simulated_ms, run.rage_attacks, run.rage_cancellations
                ),
                Some(failure) => println!("  ❌ seed {seed}: {}", failure.red()),
            }
        }
        run
    }
}

/// The last three answers, newest first.
fn recent_decisions(summary: &SimulationSummary) -> String {
    let log = &summary.metrics.decision_log;
    if log.is_empty() {
        return "no decisions recorded".to_string();
    }
    log.iter()
        .rev()
        .take(3)
        .map(|entry| {
            format!(
                "turn {} stage {} q{} picked '{}' ({}, {})",
                entry.turn,
                entry.stage + 1,
                entry.question_index + 1,
                entry.choice_label,
                if entry.correct { "correct" } else { "wrong" },
                entry.rationale.as_deref().unwrap_or(entry.policy_name.as_str())
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}
