use anyhow::{Result, anyhow};
use statsmart_battle::Outcome;

use crate::logic::{PlayStrategy, SimulationPlan, SimulationSummary};

/// A named simulation plan runnable from the CLI.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn new(key: &'static str, name: &'static str, plan: SimulationPlan) -> Self {
        Self { key, name, plan }
    }
}

pub fn catalog_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::new(
            "perfect-run",
            "Perfect Run",
            base_plan(PlayStrategy::Perfect)
                .with_expectation(victory_expectation)
                .with_expectation(flawless_expectation),
        ),
        TestScenario::new(
            "opening-miss",
            "Opening Miss",
            base_plan(PlayStrategy::OpeningMiss)
                .with_expectation(victory_expectation)
                .with_expectation(opening_miss_expectation),
        ),
        TestScenario::new(
            "hapless-defeat",
            "Hapless Defeat",
            base_plan(PlayStrategy::Hapless).with_expectation(defeat_expectation),
        ),
        TestScenario::new(
            "boss-rage-idle",
            "Idle Through Boss Rage",
            base_plan(PlayStrategy::RageWaiter)
                .with_expectation(victory_expectation)
                .with_expectation(single_rage_expectation),
        ),
        TestScenario::new(
            "stage-retry",
            "Stage Retry After Defeat",
            base_plan(PlayStrategy::Stumbler { stage: 3 })
                .with_stage_retries(1)
                .with_expectation(victory_expectation)
                .with_expectation(stage_retry_expectation),
        ),
        TestScenario::new(
            "padding-anti-repeat",
            "Short Quiz Padding",
            base_plan(PlayStrategy::Perfect)
                .with_quiz_limit(5)
                .with_expectation(padding_expectation)
                .with_expectation(victory_expectation),
        ),
        TestScenario::new(
            "steady-learner",
            "Steady Learner",
            base_plan(PlayStrategy::Learner { accuracy: 0.8 })
                .with_stage_retries(3)
                .with_expectation(outcome_expectation),
        ),
        TestScenario::new(
            "coinflip-grind",
            "Coinflip Grind",
            base_plan(PlayStrategy::Coinflip).with_expectation(outcome_expectation),
        ),
        TestScenario::new(
            "unavailable-quiz",
            "Unavailable Quiz",
            base_plan(PlayStrategy::Perfect)
                .with_quiz_limit(0)
                .with_expectation(unavailable_expectation),
        ),
    ]
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let key = match name.to_lowercase().as_str() {
        "perfect" | "smoke" => "perfect-run".to_string(),
        "miss" => "opening-miss".to_string(),
        "hapless" | "defeat" => "hapless-defeat".to_string(),
        "rage" => "boss-rage-idle".to_string(),
        "retry" => "stage-retry".to_string(),
        "padding" => "padding-anti-repeat".to_string(),
        "learner" => "steady-learner".to_string(),
        "coinflip" | "random" => "coinflip-grind".to_string(),
        "unavailable" | "empty" => "unavailable-quiz".to_string(),
        other => other.to_string(),
    };
    catalog_scenarios()
        .into_iter()
        .find(|scenario| scenario.key == key)
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog_scenarios()
        .iter()
        .map(|scenario| (scenario.key, scenario.name))
        .collect()
}

fn base_plan(strategy: PlayStrategy) -> SimulationPlan {
    SimulationPlan::new(strategy).with_expectation(invariants_expectation)
}

fn invariants_expectation(summary: &SimulationSummary) -> Result<()> {
    if let Some(first) = summary.metrics.invariant_violations.first() {
        return Err(anyhow!(
            "{} invariant violations, first: {first}",
            summary.metrics.invariant_violations.len()
        ));
    }
    anyhow::ensure!(
        !summary.halted(),
        "run halted before an outcome: {}",
        summary.ending_message
    );
    Ok(())
}

fn outcome_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(summary.available, "quiz should be available");
    let lives = summary.final_lives().unwrap_or_default();
    match summary.outcome {
        Some(Outcome::Defeat) => anyhow::ensure!(lives == 0, "defeat with {lives} lives"),
        Some(Outcome::Victory) => anyhow::ensure!(lives > 0, "victory without lives"),
        None => anyhow::bail!("no outcome reached"),
    }
    Ok(())
}

fn victory_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.outcome == Some(Outcome::Victory),
        "expected victory, got {}",
        summary.ending_message
    );
    let view = summary
        .final_view
        .as_ref()
        .ok_or_else(|| anyhow!("victory without a final view"))?;
    anyhow::ensure!(
        view.stage_index == summary.config.boss_stage() && view.stage_health == 0,
        "victory declared at stage {} with {} health",
        view.stage_index + 1,
        view.stage_health
    );
    Ok(())
}

fn defeat_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.outcome == Some(Outcome::Defeat),
        "expected defeat, got {}",
        summary.ending_message
    );
    anyhow::ensure!(
        summary.final_lives() == Some(0),
        "defeat should leave no lives"
    );
    anyhow::ensure!(
        summary.metrics.correct_answers < summary.sequence.len(),
        "defeat after answering every question"
    );
    Ok(())
}

fn flawless_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.metrics.wrong_answers == 0,
        "perfect play recorded {} misses",
        summary.metrics.wrong_answers
    );
    anyhow::ensure!(
        summary.metrics.correct_answers == summary.sequence.len(),
        "answered {} of {} questions",
        summary.metrics.correct_answers,
        summary.sequence.len()
    );
    anyhow::ensure!(
        summary.final_lives() == Some(summary.config.starting_lives),
        "perfect play lost lives"
    );
    Ok(())
}

fn opening_miss_expectation(summary: &SimulationSummary) -> Result<()> {
    let cfg = &summary.config;
    anyhow::ensure!(
        summary.metrics.wrong_answers == 1,
        "expected exactly one miss, saw {}",
        summary.metrics.wrong_answers
    );
    let expected = cfg.starting_lives.saturating_sub(cfg.enemy_attack_damage);
    anyhow::ensure!(
        summary.final_lives() == Some(expected),
        "opening miss should leave {expected} lives"
    );
    Ok(())
}

fn single_rage_expectation(summary: &SimulationSummary) -> Result<()> {
    let cfg = &summary.config;
    anyhow::ensure!(
        summary.metrics.rage_attacks == 1,
        "boss rage fired {} times",
        summary.metrics.rage_attacks
    );
    let expected = cfg.starting_lives.saturating_sub(cfg.boss_special_damage);
    anyhow::ensure!(
        summary.final_lives() == Some(expected),
        "rage special should leave {expected} lives"
    );
    Ok(())
}

fn stage_retry_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.metrics.restarts == 1,
        "expected one stage retry, saw {}",
        summary.metrics.restarts
    );
    anyhow::ensure!(
        summary.final_lives() == Some(summary.config.restart_stage_lives),
        "retried stage should finish on the reduced life pool"
    );
    Ok(())
}

fn padding_expectation(summary: &SimulationSummary) -> Result<()> {
    let sequence = &summary.sequence;
    let source = &summary.source_items;
    anyhow::ensure!(
        sequence.len() == summary.config.total_health(),
        "sequence has {} slots, expected {}",
        sequence.len(),
        summary.config.total_health()
    );
    anyhow::ensure!(
        sequence.starts_with(source),
        "source items should lead the sequence in order"
    );
    let distinct_source = source.windows(2).all(|pair| pair[0] != pair[1]);
    if source.len() > 1
        && distinct_source
        && let Some(idx) = sequence.windows(2).position(|pair| pair[0] == pair[1])
    {
        anyhow::bail!("question repeated back-to-back at slots {idx} and {}", idx + 1);
    }
    Ok(())
}

fn unavailable_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(!summary.available, "empty quiz should be unavailable");
    anyhow::ensure!(summary.turns.is_empty(), "no turns without a session");
    Ok(())
}
