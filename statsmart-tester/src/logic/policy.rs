use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use statsmart_battle::{EncounterSnapshot, QuizItem};

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub choice_index: usize,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(choice_index: usize, rationale: Option<String>) -> Self {
        Self {
            choice_index,
            rationale,
        }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Select a choice for the open question, or `None` to let timers run.
    fn pick_choice(
        &mut self,
        view: &EncounterSnapshot,
        question: &QuizItem,
    ) -> Option<PolicyDecision>;

    /// Called after the harness retried a stage following a defeat.
    fn on_stage_restart(&mut self) {}
}

/// Built-in play strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlayStrategy {
    /// Always answers correctly.
    Perfect,
    /// Misses the very first question, then plays perfectly.
    OpeningMiss,
    /// Picks a wrong answer whenever one is still enabled.
    Hapless,
    /// Plays perfectly but sits out every boss rage window.
    RageWaiter,
    /// Misses from `stage` onwards until the first stage retry.
    Stumbler { stage: usize },
    /// Answers correctly with probability `accuracy`.
    Learner { accuracy: f64 },
    /// Picks uniformly among the enabled choices.
    Coinflip,
}

impl PlayStrategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PlayStrategy::Perfect => "Perfect",
            PlayStrategy::OpeningMiss => "Opening Miss",
            PlayStrategy::Hapless => "Hapless",
            PlayStrategy::RageWaiter => "Rage Waiter",
            PlayStrategy::Stumbler { .. } => "Stumbler",
            PlayStrategy::Learner { .. } => "Learner",
            PlayStrategy::Coinflip => "Coinflip",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            PlayStrategy::Perfect => Box::new(PerfectPolicy),
            PlayStrategy::OpeningMiss => Box::new(OpeningMissPolicy { missed: false }),
            PlayStrategy::Hapless => Box::new(HaplessPolicy),
            PlayStrategy::RageWaiter => Box::new(RageWaiterPolicy),
            PlayStrategy::Stumbler { stage } => Box::new(StumblerPolicy {
                stage,
                recovered: false,
            }),
            PlayStrategy::Learner { accuracy } => Box::new(LearnerPolicy::new(seed, accuracy)),
            PlayStrategy::Coinflip => Box::new(CoinflipPolicy {
                rng: ChaCha20Rng::seed_from_u64(seed),
            }),
        }
    }
}

impl fmt::Display for PlayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayStrategy::Stumbler { stage } => write!(f, "{} (stage {})", self.label(), stage + 1),
            PlayStrategy::Learner { accuracy } => {
                write!(f, "{} ({:.0}%)", self.label(), accuracy * 100.0)
            }
            _ => f.write_str(self.label()),
        }
    }
}

struct PerfectPolicy;
struct HaplessPolicy;
struct RageWaiterPolicy;

struct OpeningMissPolicy {
    missed: bool,
}

struct StumblerPolicy {
    stage: usize,
    recovered: bool,
}

struct LearnerPolicy {
    rng: ChaCha20Rng,
    accuracy: f64,
}

impl LearnerPolicy {
    fn new(seed: u64, accuracy: f64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            accuracy: accuracy.clamp(0.0, 1.0),
        }
    }
}

struct CoinflipPolicy {
    rng: ChaCha20Rng,
}

impl PlayerPolicy for PerfectPolicy {
    fn name(&self) -> &'static str {
        "Perfect"
    }

    fn pick_choice(
        &mut self,
        _view: &EncounterSnapshot,
        question: &QuizItem,
    ) -> Option<PolicyDecision> {
        Some(PolicyDecision::new(correct_choice(question), None))
    }
}

impl PlayerPolicy for OpeningMissPolicy {
    fn name(&self) -> &'static str {
        "Opening Miss"
    }

    fn pick_choice(
        &mut self,
        view: &EncounterSnapshot,
        question: &QuizItem,
    ) -> Option<PolicyDecision> {
        if !self.missed {
            self.missed = true;
            if let Some(wrong) = open_wrong_choice(view, question) {
                return Some(PolicyDecision::new(wrong, Some("opening miss".to_string())));
            }
        }
        Some(PolicyDecision::new(correct_choice(question), None))
    }
}

impl PlayerPolicy for HaplessPolicy {
    fn name(&self) -> &'static str {
        "Hapless"
    }

    fn pick_choice(
        &mut self,
        view: &EncounterSnapshot,
        question: &QuizItem,
    ) -> Option<PolicyDecision> {
        Some(miss_if_possible(view, question))
    }
}

impl PlayerPolicy for RageWaiterPolicy {
    fn name(&self) -> &'static str {
        "Rage Waiter"
    }

    fn pick_choice(
        &mut self,
        view: &EncounterSnapshot,
        question: &QuizItem,
    ) -> Option<PolicyDecision> {
        if view.rage_timer_visible && !view.rage_performed {
            return None;
        }
        Some(PolicyDecision::new(correct_choice(question), None))
    }
}

impl PlayerPolicy for StumblerPolicy {
    fn name(&self) -> &'static str {
        "Stumbler"
    }

    fn pick_choice(
        &mut self,
        view: &EncounterSnapshot,
        question: &QuizItem,
    ) -> Option<PolicyDecision> {
        if !self.recovered && view.stage_index >= self.stage {
            return Some(miss_if_possible(view, question));
        }
        Some(PolicyDecision::new(correct_choice(question), None))
    }

    fn on_stage_restart(&mut self) {
        self.recovered = true;
    }
}

impl PlayerPolicy for LearnerPolicy {
    fn name(&self) -> &'static str {
        "Learner"
    }

    fn pick_choice(
        &mut self,
        view: &EncounterSnapshot,
        question: &QuizItem,
    ) -> Option<PolicyDecision> {
        let roll: f64 = self.rng.r#gen();
        if roll < self.accuracy {
            return Some(PolicyDecision::new(
                correct_choice(question),
                Some(format!("recalled (roll {roll:.2})")),
            ));
        }
        Some(miss_if_possible(view, question))
    }
}

impl PlayerPolicy for CoinflipPolicy {
    fn name(&self) -> &'static str {
        "Coinflip"
    }

    fn pick_choice(
        &mut self,
        view: &EncounterSnapshot,
        _question: &QuizItem,
    ) -> Option<PolicyDecision> {
        let enabled = enabled_choices(view);
        if enabled.is_empty() {
            return Some(PolicyDecision::new(0, Some("no enabled choice".to_string())));
        }
        let pick = enabled[self.rng.gen_range(0..enabled.len())];
        Some(PolicyDecision::new(
            pick,
            Some(format!("{} open", enabled.len())),
        ))
    }
}

fn correct_choice(question: &QuizItem) -> usize {
    question.answer_index().unwrap_or(0)
}

fn enabled_choices(view: &EncounterSnapshot) -> Vec<usize> {
    view.question
        .as_ref()
        .map(|question| {
            question
                .choices
                .iter()
                .enumerate()
                .filter(|(_, choice)| !choice.disabled)
                .map(|(idx, _)| idx)
                .collect()
        })
        .unwrap_or_default()
}

fn open_wrong_choice(view: &EncounterSnapshot, question: &QuizItem) -> Option<usize> {
    let right = correct_choice(question);
    enabled_choices(view).into_iter().find(|idx| *idx != right)
}

fn miss_if_possible(view: &EncounterSnapshot, question: &QuizItem) -> PolicyDecision {
    match open_wrong_choice(view, question) {
        Some(wrong) => PolicyDecision::new(wrong, Some("deliberate miss".to_string())),
        None => PolicyDecision::new(
            correct_choice(question),
            Some("no wrong choice left".to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statsmart_battle::{BattleConfig, EncounterSession};

    fn view() -> (EncounterSnapshot, QuizItem) {
        let items = vec![QuizItem::new("q", &["a", "b", "c"], 2, "")];
        let session = EncounterSession::seeded(&items, BattleConfig::default(), 3)
            .into_session()
            .unwrap();
        let question = session.current_question().unwrap().clone();
        (session.snapshot(), question)
    }

    #[test]
    fn perfect_policy_picks_the_answer() {
        let (view, question) = view();
        let mut policy = PlayStrategy::Perfect.create_policy(1);
        assert_eq!(policy.pick_choice(&view, &question).unwrap().choice_index, 2);
    }

    #[test]
    fn hapless_policy_falls_back_to_the_answer() {
        let (mut view, question) = view();
        let mut policy = PlayStrategy::Hapless.create_policy(1);
        assert_eq!(policy.pick_choice(&view, &question).unwrap().choice_index, 0);

        if let Some(q) = view.question.as_mut() {
            q.choices[0].disabled = true;
            q.choices[1].disabled = true;
        }
        let decision = policy.pick_choice(&view, &question).unwrap();
        assert_eq!(decision.choice_index, 2);
        assert_eq!(decision.rationale.as_deref(), Some("no wrong choice left"));
    }

    #[test]
    fn stumbler_recovers_after_restart() {
        let (view, question) = view();
        let mut policy = PlayStrategy::Stumbler { stage: 0 }.create_policy(1);
        assert_ne!(policy.pick_choice(&view, &question).unwrap().choice_index, 2);
        policy.on_stage_restart();
        assert_eq!(policy.pick_choice(&view, &question).unwrap().choice_index, 2);
    }

    #[test]
    fn rage_waiter_holds_while_rage_counts() {
        let (mut view, question) = view();
        let mut policy = PlayStrategy::RageWaiter.create_policy(1);
        view.rage_timer_visible = true;
        assert!(policy.pick_choice(&view, &question).is_none());
        view.rage_performed = true;
        assert!(policy.pick_choice(&view, &question).is_some());
    }

    #[test]
    fn coinflip_is_deterministic_per_seed() {
        let (view, question) = view();
        let picks = |seed| {
            let mut policy = PlayStrategy::Coinflip.create_policy(seed);
            (0..16)
                .map(|_| policy.pick_choice(&view, &question).unwrap().choice_index)
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(9), picks(9));
        assert!(picks(9).iter().all(|idx| *idx < 3));
    }

    #[test]
    fn learner_extremes_are_exact() {
        let (view, question) = view();
        let mut sharp = PlayStrategy::Learner { accuracy: 1.0 }.create_policy(4);
        let mut lost = PlayStrategy::Learner { accuracy: 0.0 }.create_policy(4);
        for _ in 0..8 {
            assert_eq!(sharp.pick_choice(&view, &question).unwrap().choice_index, 2);
            assert_ne!(lost.pick_choice(&view, &question).unwrap().choice_index, 2);
        }
    }

    #[test]
    fn labels_render_parameters() {
        assert_eq!(PlayStrategy::Stumbler { stage: 3 }.to_string(), "Stumbler (stage 4)");
        assert_eq!(
            PlayStrategy::Learner { accuracy: 0.75 }.to_string(),
            "Learner (75%)"
        );
    }
}
