//! Turns a choice (or an expired rage window) into a timed resolution.
//!
//! The resolver applies the instant effects of an action (input lock,
//! disabled choice, rage cancellation) and returns every later effect as
//! a [`ScheduledStep`] so the session can replay them on its clock.
use crate::config::BattleConfig;
use crate::data::QuizItem;
use crate::events::BattleEvent;
use crate::rng::RandomSource;
use crate::roster::{AnimationClock, AnimationKind, Combatant, SpriteKey};
use crate::state::{EncounterState, Outcome, Phase};

/// State change applied when its scheduled delay elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateDelta {
    DamageEnemy { amount: u8 },
    DamagePlayer { amount: u8 },
    /// Next question; disabled choices reset.
    AdvanceQuestion,
    UnlockInput,
    BeginStageTransition,
    DeclareOutcome(Outcome),
    /// Leave the armed rage phase once its attack has landed.
    SettleRage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Emit(BattleEvent),
    Animate {
        target: Combatant,
        sprite: SpriteKey,
        kind: AnimationKind,
        duration_ms: u64,
    },
    ShowBubble {
        target: Combatant,
        amount: u8,
    },
    Apply(StateDelta),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledStep {
    pub delay_ms: u64,
    pub step: Step,
}

impl ScheduledStep {
    const fn at(delay_ms: u64, step: Step) -> Self {
        Self { delay_ms, step }
    }
}

/// Everything an accepted action still has to do, in scheduling order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    pub steps: Vec<ScheduledStep>,
    /// The rage countdown timers must be cancelled before any step runs.
    pub cancels_rage: bool,
}

impl Resolution {
    /// Delay of the last scheduled step.
    #[must_use]
    pub fn settle_delay_ms(&self) -> u64 {
        self.steps.iter().map(|step| step.delay_ms).max().unwrap_or(0)
    }
}

/// Read-only inputs for resolving one choice.
pub struct ResolverContext<'a> {
    pub config: &'a BattleConfig,
    pub clock: &'a dyn AnimationClock,
    pub question: &'a QuizItem,
}

struct Strike {
    attacker: Combatant,
    attacker_sprite: SpriteKey,
    kind: AnimationKind,
    defender_sprite: SpriteKey,
    amount: u8,
    lethal: bool,
}

impl Strike {
    const fn defender(&self) -> Combatant {
        match self.attacker {
            Combatant::Player => Combatant::Enemy,
            Combatant::Enemy => Combatant::Player,
        }
    }

    /// Attack, defender reaction, bubble and damage; returns the delay at
    /// which a lethal blow's aftermath lands (or the attack length).
    fn schedule(
        &self,
        cfg: &BattleConfig,
        clock: &dyn AnimationClock,
        steps: &mut Vec<ScheduledStep>,
    ) -> u64 {
        let defender = self.defender();
        let attack_ms = clock.duration_ms(self.attacker_sprite, self.kind);
        let hurt_ms = clock.duration_ms(self.defender_sprite, AnimationKind::Hurt);
        let mid_ms = attack_ms / 2;

        steps.push(ScheduledStep::at(
            0,
            Step::Animate {
                target: self.attacker,
                sprite: self.attacker_sprite,
                kind: self.kind,
                duration_ms: attack_ms,
            },
        ));
        steps.push(ScheduledStep::at(
            mid_ms,
            Step::Animate {
                target: defender,
                sprite: self.defender_sprite,
                kind: AnimationKind::Hurt,
                duration_ms: hurt_ms,
            },
        ));
        if !self.lethal {
            steps.push(ScheduledStep::at(
                mid_ms + hurt_ms,
                idle(defender, self.defender_sprite),
            ));
        }
        steps.push(ScheduledStep::at(
            attack_ms,
            idle(self.attacker, self.attacker_sprite),
        ));
        steps.push(ScheduledStep::at(
            attack_ms,
            Step::ShowBubble {
                target: defender,
                amount: self.amount,
            },
        ));
        let delta = match defender {
            Combatant::Enemy => StateDelta::DamageEnemy {
                amount: self.amount,
            },
            Combatant::Player => StateDelta::DamagePlayer {
                amount: self.amount,
            },
        };
        steps.push(ScheduledStep::at(attack_ms, Step::Apply(delta)));

        if !self.lethal {
            return attack_ms;
        }
        let death_at = mid_ms + hurt_ms + cfg.timing.hurt_to_death_gap_ms;
        let death_ms = clock.duration_ms(self.defender_sprite, AnimationKind::Death);
        steps.push(ScheduledStep::at(
            death_at,
            Step::Animate {
                target: defender,
                sprite: self.defender_sprite,
                kind: AnimationKind::Death,
                duration_ms: death_ms,
            },
        ));
        death_at + death_ms + cfg.timing.death_linger_ms
    }
}

const fn idle(target: Combatant, sprite: SpriteKey) -> Step {
    Step::Animate {
        target,
        sprite,
        kind: AnimationKind::Idle,
        duration_ms: 0,
    }
}

fn choice_result(state: &EncounterState, choice: usize, correct: bool) -> ScheduledStep {
    ScheduledStep::at(
        0,
        Step::Emit(BattleEvent::ChoiceResult {
            question_index: state.question_index,
            choice,
            correct,
        }),
    )
}

/// Drop a visible rage countdown back to idle; reports whether one was live.
fn cancel_visible_rage(state: &mut EncounterState) -> bool {
    if state.rage_timer_visible() {
        state.phase = Phase::in_progress();
        return true;
    }
    false
}

/// Resolve a player's selection.
///
/// Returns `None` (and leaves `state` untouched) when the selection is not
/// acceptable: terminal outcome, locked input, out-of-range or disabled
/// choice.
pub fn resolve_choice(
    state: &mut EncounterState,
    ctx: &ResolverContext<'_>,
    rng: &mut dyn RandomSource,
    choice: usize,
) -> Option<Resolution> {
    if state.is_terminal() || state.is_input_locked() {
        return None;
    }
    if choice >= ctx.question.choices.len() || state.is_choice_disabled(choice) {
        return None;
    }

    let cfg = ctx.config;
    let enemy_sprite = SpriteKey::for_stage(state.stage_index);
    let mut resolution = Resolution::default();

    if ctx.question.is_correct(choice) {
        state.input_locked = true;
        resolution.steps.push(choice_result(state, choice, true));
        if cancel_visible_rage(state) {
            resolution.cancels_rage = true;
            resolution
                .steps
                .push(ScheduledStep::at(0, Step::Emit(BattleEvent::RageCancelled)));
        }

        let remaining = state.stage_health.saturating_sub(cfg.player_attack_damage);
        let strike = Strike {
            attacker: Combatant::Player,
            attacker_sprite: SpriteKey::Soldier,
            kind: AnimationKind::attack(rng.coin_flip()),
            defender_sprite: enemy_sprite,
            amount: cfg.player_attack_damage,
            lethal: remaining == 0,
        };
        let settle_at = strike.schedule(cfg, ctx.clock, &mut resolution.steps);
        if strike.lethal {
            let finish = if cfg.is_boss_stage(state.stage_index) {
                StateDelta::DeclareOutcome(Outcome::Victory)
            } else {
                StateDelta::BeginStageTransition
            };
            resolution
                .steps
                .push(ScheduledStep::at(settle_at, Step::Apply(finish)));
        } else {
            resolution.steps.push(ScheduledStep::at(
                settle_at,
                Step::Apply(StateDelta::AdvanceQuestion),
            ));
            resolution.steps.push(ScheduledStep::at(
                settle_at,
                Step::Apply(StateDelta::UnlockInput),
            ));
        }
        return Some(resolution);
    }

    if cfg.shield_applies(state.stage_index) && state.shield_remaining > 0 {
        state.shield_remaining = 0;
        state.disable_choice(choice);
        resolution.steps.push(choice_result(state, choice, false));
        resolution.steps.push(ScheduledStep::at(
            0,
            Step::Emit(BattleEvent::ShieldAbsorbed { choice }),
        ));
        return Some(resolution);
    }

    state.disable_choice(choice);
    state.input_locked = true;
    resolution.steps.push(choice_result(state, choice, false));

    let boss_special = cfg.is_boss_stage(state.stage_index) && state.rage_timer_visible();
    let (kind, amount) = if boss_special {
        if cancel_visible_rage(state) {
            resolution.cancels_rage = true;
            resolution
                .steps
                .push(ScheduledStep::at(0, Step::Emit(BattleEvent::RageCancelled)));
        }
        (AnimationKind::Attack2, cfg.boss_special_damage)
    } else {
        (
            AnimationKind::attack(rng.coin_flip()),
            cfg.enemy_attack_damage,
        )
    };
    schedule_enemy_attack(state, cfg, ctx.clock, kind, amount, &mut resolution, None);
    Some(resolution)
}

/// Resolve the boss's automatic attack when the rage window runs out.
///
/// Fires at most once per boss engagement; returns `None` when the boss is
/// not counting down, the attack already happened, or the encounter ended.
pub fn resolve_rage_attack(
    state: &mut EncounterState,
    cfg: &BattleConfig,
    clock: &dyn AnimationClock,
) -> Option<Resolution> {
    if state.is_terminal() || state.rage_performed || !state.rage_timer_visible() {
        return None;
    }
    if !cfg.is_boss_stage(state.stage_index) {
        return None;
    }

    state.rage_performed = true;
    state.phase = Phase::RageArmed;
    state.input_locked = true;

    let mut resolution = Resolution {
        steps: vec![ScheduledStep::at(
            0,
            Step::Emit(BattleEvent::RageUnleashed {
                damage: cfg.boss_special_damage,
            }),
        )],
        cancels_rage: true,
    };
    schedule_enemy_attack(
        state,
        cfg,
        clock,
        AnimationKind::Attack2,
        cfg.boss_special_damage,
        &mut resolution,
        Some(StateDelta::SettleRage),
    );
    Some(resolution)
}

fn schedule_enemy_attack(
    state: &EncounterState,
    cfg: &BattleConfig,
    clock: &dyn AnimationClock,
    kind: AnimationKind,
    amount: u8,
    resolution: &mut Resolution,
    settle: Option<StateDelta>,
) {
    let strike = Strike {
        attacker: Combatant::Enemy,
        attacker_sprite: SpriteKey::for_stage(state.stage_index),
        kind,
        defender_sprite: SpriteKey::Soldier,
        amount,
        lethal: state.player_lives.saturating_sub(amount) == 0,
    };
    let settle_at = strike.schedule(cfg, clock, &mut resolution.steps);
    if strike.lethal {
        resolution.steps.push(ScheduledStep::at(
            settle_at,
            Step::Apply(StateDelta::DeclareOutcome(Outcome::Defeat)),
        ));
        return;
    }
    if let Some(delta) = settle {
        resolution
            .steps
            .push(ScheduledStep::at(settle_at, Step::Apply(delta)));
    }
    resolution.steps.push(ScheduledStep::at(
        settle_at,
        Step::Apply(StateDelta::UnlockInput),
    ));
}
