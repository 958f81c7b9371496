//! The encounter session: owns state, timers, randomness and the event log.
use std::fmt;

use serde::Serialize;

use crate::config::BattleConfig;
use crate::data::QuizItem;
use crate::events::{BattleEvent, EmittedEvent, stage_cleared_banner};
use crate::numbers::unit_ratio;
use crate::resolver::{
    Resolution, ResolverContext, StateDelta, Step, resolve_choice, resolve_rage_attack,
};
use crate::rng::{RandomSource, RngBundle};
use crate::roster::{AnimationClock, AnimationKind, Badge, Combatant, SpriteCatalog, SpriteKey};
use crate::sequencer::build_sequence;
use crate::state::{DamageBubble, EncounterState, Outcome, Phase, RageTimer};
use crate::timers::{FiredTimer, TimerKind, TimerRegistry};

/// Result of trying to open an encounter.
#[derive(Debug)]
pub enum QuizAvailability {
    Ready(Box<EncounterSession>),
    /// No usable quiz items; show the "no quiz available" fallback.
    Unavailable,
}

impl QuizAvailability {
    #[must_use]
    pub fn into_session(self) -> Option<EncounterSession> {
        match self {
            Self::Ready(session) => Some(*session),
            Self::Unavailable => None,
        }
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// One running encounter, driven by a virtual millisecond clock.
pub struct EncounterSession {
    config: BattleConfig,
    sequence: Vec<QuizItem>,
    state: EncounterState,
    timers: TimerRegistry<Option<Step>>,
    now_ms: u64,
    events: Vec<EmittedEvent>,
    rng: Box<dyn RandomSource + Send>,
    clock: Box<dyn AnimationClock + Send>,
    torn_down: bool,
}

impl fmt::Debug for EncounterSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncounterSession")
            .field("now_ms", &self.now_ms)
            .field("questions", &self.sequence.len())
            .field("state", &self.state)
            .field("timers", &self.timers.active_kinds())
            .field("pending_events", &self.events.len())
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl EncounterSession {
    /// Open a session over an already-built question sequence.
    #[must_use]
    pub fn from_sequence(
        sequence: Vec<QuizItem>,
        config: BattleConfig,
        rng: Box<dyn RandomSource + Send>,
        clock: Box<dyn AnimationClock + Send>,
    ) -> QuizAvailability {
        if sequence.is_empty() {
            log::info!("no quiz items available; encounter not started");
            return QuizAvailability::Unavailable;
        }
        let state = EncounterState::fresh(&config);
        let mut session = Self {
            config,
            sequence,
            state,
            timers: TimerRegistry::new(),
            now_ms: 0,
            events: Vec::new(),
            rng,
            clock,
            torn_down: false,
        };
        session.begin_stage();
        QuizAvailability::Ready(Box::new(session))
    }

    /// Build the sequence from raw items and open a session whose padding
    /// and attack variants derive from `seed`.
    #[must_use]
    pub fn seeded(items: &[QuizItem], config: BattleConfig, seed: u64) -> QuizAvailability {
        let bundle = RngBundle::from_user_seed(seed);
        let sequence = {
            let mut padding = bundle.padding();
            build_sequence(items, config.total_health(), &mut *padding)
        };
        Self::from_sequence(
            sequence,
            config,
            Box::new(bundle.into_combat()),
            Box::new(SpriteCatalog),
        )
    }

    #[must_use]
    pub const fn state(&self) -> &EncounterState {
        &self.state
    }

    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    #[must_use]
    pub fn sequence(&self) -> &[QuizItem] {
        &self.sequence
    }

    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    #[must_use]
    pub const fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuizItem> {
        self.sequence.get(self.state.question_index)
    }

    /// Timer kinds with at least one live countdown.
    #[must_use]
    pub fn active_timers(&self) -> Vec<TimerKind> {
        self.timers.active_kinds()
    }

    /// When the next timer is due, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        if self.torn_down {
            return None;
        }
        self.timers.next_due()
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<EmittedEvent> {
        std::mem::take(&mut self.events)
    }

    /// Select a choice on the current question.
    ///
    /// Returns `false` when the selection was ignored.
    pub fn select_choice(&mut self, choice: usize) -> bool {
        if self.torn_down {
            return false;
        }
        let Some(question) = self.sequence.get(self.state.question_index) else {
            return false;
        };
        let ctx = ResolverContext {
            config: &self.config,
            clock: self.clock.as_ref(),
            question,
        };
        let Some(resolution) = resolve_choice(&mut self.state, &ctx, self.rng.as_mut(), choice)
        else {
            log::debug!(
                "ignored choice {choice} on question {}",
                self.state.question_index
            );
            return false;
        };
        self.run_resolution(resolution);
        true
    }

    /// Move the clock forward by `delta_ms`, firing every timer that comes due.
    pub fn advance(&mut self, delta_ms: u64) {
        self.advance_to(self.now_ms.saturating_add(delta_ms));
    }

    /// Fire timers in due order up to and including `target_ms`.
    pub fn advance_to(&mut self, target_ms: u64) {
        if self.torn_down {
            return;
        }
        while let Some(fired) = self.timers.pop_due(target_ms) {
            self.now_ms = self.now_ms.max(fired.due_at_ms);
            self.fire(fired);
        }
        self.now_ms = self.now_ms.max(target_ms);
    }

    const fn due_in(&self, delay_ms: u64) -> u64 {
        self.now_ms.saturating_add(delay_ms)
    }

    /// Retry the current stage after a defeat with the reduced life pool.
    pub fn restart_stage(&mut self) -> bool {
        if self.torn_down || self.state.outcome() != Some(Outcome::Defeat) {
            return false;
        }
        self.timers.cancel_all();
        let stage = self.state.stage_index;
        self.state.restart_at_stage(&self.config, stage);
        log::info!(
            "restarting stage {} with {} lives",
            stage + 1,
            self.state.player_lives
        );
        self.emit_idle_poses();
        self.begin_stage();
        true
    }

    /// Start over from the first stage, keeping the question sequence.
    pub fn restart_quiz(&mut self) -> bool {
        if self.torn_down || !self.state.is_terminal() {
            return false;
        }
        self.timers.cancel_all();
        self.state = EncounterState::fresh(&self.config);
        log::info!("restarting quiz from stage 1");
        self.emit_idle_poses();
        self.begin_stage();
        true
    }

    /// Cancel every timer and freeze the session.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        let dropped = self.timers.cancel_all();
        self.torn_down = true;
        log::debug!("session torn down at {}ms ({dropped} timers cancelled)", self.now_ms);
    }

    /// Read-only view for rendering.
    #[must_use]
    pub fn snapshot(&self) -> EncounterSnapshot {
        let state = &self.state;
        let enemy = SpriteKey::for_stage(state.stage_index);
        let question = self.current_question().map(|item| QuestionView {
            prompt: item.question.clone(),
            choices: item
                .choices
                .iter()
                .enumerate()
                .map(|(idx, label)| ChoiceView {
                    label: label.clone(),
                    disabled: state.is_choice_disabled(idx),
                })
                .collect(),
        });
        let stage_max_health = self.config.stage_max_health(state.stage_index);
        EncounterSnapshot {
            now_ms: self.now_ms,
            phase: state.phase,
            outcome: state.outcome(),
            stage_index: state.stage_index,
            stage_count: self.config.stage_count(),
            stage_health: state.stage_health,
            stage_max_health,
            enemy_health_ratio: unit_ratio(
                u64::from(state.stage_health),
                u64::from(stage_max_health),
            ),
            player_lives: state.player_lives,
            max_lives: self.config.starting_lives,
            question_index: state.question_index,
            question_count: self.sequence.len(),
            question,
            input_locked: self.torn_down || state.is_input_locked(),
            enemy,
            enemy_name: enemy.display_name(),
            badges: enemy.badges(),
            boss_intro_active: state.boss_intro_active(),
            boss_intro_countdown: state.boss_intro_countdown(),
            rage_timer_visible: state.rage_timer_visible(),
            rage_armed: state.rage_armed(),
            rage_progress: state.rage_progress(self.config.timing.rage_window_ms),
            rage_performed: state.rage_performed,
            shield_remaining: state.shield_remaining,
            player_animation: state.player_animation,
            enemy_animation: state.enemy_animation,
            damage_bubble: state.damage_bubble,
            banner: state.banner.clone(),
        }
    }

    fn emit(&mut self, event: BattleEvent) {
        self.events.push(EmittedEvent {
            at_ms: self.now_ms,
            event,
        });
    }

    fn emit_idle_poses(&mut self) {
        let enemy = SpriteKey::for_stage(self.state.stage_index);
        self.apply_step(Step::Animate {
            target: Combatant::Player,
            sprite: SpriteKey::Soldier,
            kind: AnimationKind::Idle,
            duration_ms: 0,
        });
        self.apply_step(Step::Animate {
            target: Combatant::Enemy,
            sprite: enemy,
            kind: AnimationKind::Idle,
            duration_ms: 0,
        });
    }

    /// Announce the current stage and arm its stage-scoped countdowns.
    fn begin_stage(&mut self) {
        self.timers.cancel(TimerKind::RageTick);
        self.timers.cancel(TimerKind::RageExpiry);
        self.timers.cancel(TimerKind::BossIntro);

        let stage = self.state.stage_index;
        let enemy = SpriteKey::for_stage(stage);
        log::debug!("entering stage {} ({})", stage + 1, enemy.display_name());
        self.emit(BattleEvent::StageEntered {
            stage,
            enemy,
            health: self.state.stage_health,
        });

        if let Phase::BossIntro { countdown } = self.state.phase {
            self.emit(BattleEvent::BossIntroCountdown {
                remaining: countdown,
            });
            let tick = self.config.timing.boss_intro_tick_ms;
            self.timers
                .start_periodic(TimerKind::BossIntro, self.due_in(tick), tick, None);
        }
    }

    fn start_rage(&mut self) {
        let timing = &self.config.timing;
        let (tick, window) = (timing.rage_tick_ms, timing.rage_window_ms);
        self.state.phase = Phase::InProgress {
            rage: RageTimer::Counting {
                started_at_ms: self.now_ms,
                sampled_elapsed_ms: 0,
            },
        };
        self.timers
            .start_periodic(TimerKind::RageTick, self.due_in(tick), tick, None);
        self.timers
            .start(TimerKind::RageExpiry, self.due_in(window), None);
        self.emit(BattleEvent::RageStarted { window_ms: window });
    }

    fn run_resolution(&mut self, resolution: Resolution) {
        if resolution.cancels_rage {
            self.timers.cancel(TimerKind::RageTick);
            self.timers.cancel(TimerKind::RageExpiry);
        }
        for scheduled in resolution.steps {
            if scheduled.delay_ms == 0 {
                self.apply_step(scheduled.step);
            } else {
                self.timers.schedule(
                    TimerKind::Resolution,
                    self.due_in(scheduled.delay_ms),
                    Some(scheduled.step),
                );
            }
        }
    }

    fn fire(&mut self, fired: FiredTimer<Option<Step>>) {
        match fired.kind {
            TimerKind::Resolution => {
                if let Some(step) = fired.payload {
                    self.apply_step(step);
                }
            }
            TimerKind::DamageBubble => {
                if let Some(bubble) = self.state.damage_bubble.take() {
                    self.emit(BattleEvent::DamageBubbleCleared {
                        target: bubble.target,
                    });
                }
            }
            TimerKind::StageBanner => self.finish_stage_transition(),
            TimerKind::BossIntro => self.tick_boss_intro(),
            TimerKind::RageTick => {
                if let Phase::InProgress {
                    rage: RageTimer::Counting { started_at_ms, .. },
                } = self.state.phase
                {
                    self.state.phase = Phase::InProgress {
                        rage: RageTimer::Counting {
                            started_at_ms,
                            sampled_elapsed_ms: self.now_ms.saturating_sub(started_at_ms),
                        },
                    };
                }
            }
            TimerKind::RageExpiry => self.expire_rage(),
        }
    }

    fn tick_boss_intro(&mut self) {
        let Phase::BossIntro { countdown } = self.state.phase else {
            self.timers.cancel(TimerKind::BossIntro);
            return;
        };
        let remaining = countdown.saturating_sub(1);
        self.emit(BattleEvent::BossIntroCountdown { remaining });
        if remaining > 0 {
            self.state.phase = Phase::BossIntro {
                countdown: remaining,
            };
            return;
        }
        self.timers.cancel(TimerKind::BossIntro);
        self.start_rage();
    }

    fn expire_rage(&mut self) {
        self.timers.cancel(TimerKind::RageTick);
        if let Phase::InProgress {
            rage: RageTimer::Counting { started_at_ms, .. },
        } = self.state.phase
        {
            self.state.phase = Phase::InProgress {
                rage: RageTimer::Counting {
                    started_at_ms,
                    sampled_elapsed_ms: self.config.timing.rage_window_ms,
                },
            };
        }
        let Some(resolution) =
            resolve_rage_attack(&mut self.state, &self.config, self.clock.as_ref())
        else {
            return;
        };
        log::info!(
            "rage window expired; boss strikes for {}",
            self.config.boss_special_damage
        );
        self.run_resolution(resolution);
    }

    fn finish_stage_transition(&mut self) {
        let Phase::StageTransition { cleared_stage } = self.state.phase else {
            return;
        };
        let next = (cleared_stage + 1).min(self.config.boss_stage());
        self.state.advance_question(self.sequence.len());
        self.state.enter_stage(&self.config, next);
        self.state.input_locked = false;
        self.begin_stage();
    }

    fn apply_step(&mut self, step: Step) {
        match step {
            Step::Emit(event) => self.emit(event),
            Step::Animate {
                target,
                sprite,
                kind,
                duration_ms,
            } => {
                match target {
                    Combatant::Player => self.state.player_animation = kind,
                    Combatant::Enemy => self.state.enemy_animation = kind,
                }
                self.emit(BattleEvent::Animation {
                    target,
                    sprite,
                    kind,
                    duration_ms,
                });
            }
            Step::ShowBubble { target, amount } => {
                let lifetime_ms = self.config.timing.damage_bubble_ms;
                self.state.damage_bubble = Some(DamageBubble {
                    target,
                    amount,
                    shown_at_ms: self.now_ms,
                });
                self.timers
                    .start(TimerKind::DamageBubble, self.due_in(lifetime_ms), None);
                self.emit(BattleEvent::DamageBubble {
                    target,
                    amount,
                    lifetime_ms,
                });
            }
            Step::Apply(delta) => self.apply_delta(delta),
        }
    }

    fn apply_delta(&mut self, delta: StateDelta) {
        match delta {
            StateDelta::DamageEnemy { amount } => {
                self.state.stage_health = self.state.stage_health.saturating_sub(amount);
            }
            StateDelta::DamagePlayer { amount } => {
                self.state.player_lives = self.state.player_lives.saturating_sub(amount);
            }
            StateDelta::AdvanceQuestion => self.state.advance_question(self.sequence.len()),
            StateDelta::UnlockInput => self.state.input_locked = false,
            StateDelta::SettleRage => {
                if self.state.phase == Phase::RageArmed {
                    self.state.phase = Phase::in_progress();
                }
            }
            StateDelta::BeginStageTransition => {
                let cleared_stage = self.state.stage_index;
                let banner = stage_cleared_banner(cleared_stage);
                log::debug!("{banner}");
                self.state.phase = Phase::StageTransition { cleared_stage };
                self.state.banner = Some(banner.clone());
                self.timers.start(
                    TimerKind::StageBanner,
                    self.due_in(self.config.timing.stage_banner_ms),
                    None,
                );
                self.emit(BattleEvent::StageCleared {
                    stage: cleared_stage,
                    banner,
                });
            }
            StateDelta::DeclareOutcome(outcome) => {
                self.state.phase = match outcome {
                    Outcome::Victory => Phase::Victory,
                    Outcome::Defeat => Phase::Defeat,
                };
                self.state.input_locked = true;
                self.state.damage_bubble = None;
                self.timers.cancel_all();
                log::info!(
                    "encounter ended in {outcome:?} at stage {} with {} lives",
                    self.state.stage_index + 1,
                    self.state.player_lives
                );
                self.emit(BattleEvent::OutcomeReached { outcome });
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceView {
    pub label: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub prompt: String,
    pub choices: Vec<ChoiceView>,
}

/// Everything the presentation layer needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncounterSnapshot {
    pub now_ms: u64,
    pub phase: Phase,
    pub outcome: Option<Outcome>,
    pub stage_index: usize,
    pub stage_count: usize,
    pub stage_health: u8,
    pub stage_max_health: u8,
    pub enemy_health_ratio: f32,
    pub player_lives: u8,
    pub max_lives: u8,
    pub question_index: usize,
    pub question_count: usize,
    pub question: Option<QuestionView>,
    pub input_locked: bool,
    pub enemy: SpriteKey,
    pub enemy_name: &'static str,
    pub badges: Vec<Badge>,
    pub boss_intro_active: bool,
    pub boss_intro_countdown: Option<u8>,
    pub rage_timer_visible: bool,
    pub rage_armed: bool,
    pub rage_progress: f32,
    pub rage_performed: bool,
    pub shield_remaining: u8,
    pub player_animation: AnimationKind,
    pub enemy_animation: AnimationKind,
    pub damage_bubble: Option<DamageBubble>,
    pub banner: Option<String>,
}
