//! Owned registry of every countdown a session has in flight.
use serde::{Deserialize, Serialize};

/// Countdown families the session schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    BossIntro,
    RageTick,
    RageExpiry,
    DamageBubble,
    StageBanner,
    /// Deferred step of an answer or rage resolution.
    Resolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Timer<P> {
    handle: TimerHandle,
    kind: TimerKind,
    due_at_ms: u64,
    period_ms: Option<u64>,
    payload: P,
}

/// A timer that came due, handed back to the owner to act on.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredTimer<P> {
    pub handle: TimerHandle,
    pub kind: TimerKind,
    pub due_at_ms: u64,
    pub payload: P,
}

#[derive(Debug, Clone)]
pub struct TimerRegistry<P> {
    timers: Vec<Timer<P>>,
    next_handle: u64,
}

impl<P> Default for TimerRegistry<P> {
    fn default() -> Self {
        Self {
            timers: Vec::new(),
            next_handle: 0,
        }
    }
}

impl<P: Clone> TimerRegistry<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a one-shot countdown, replacing any live timer of the same kind.
    pub fn start(&mut self, kind: TimerKind, due_at_ms: u64, payload: P) -> TimerHandle {
        self.cancel(kind);
        self.insert(kind, due_at_ms, None, payload)
    }

    /// Start a repeating countdown, replacing any live timer of the same kind.
    ///
    /// A zero period is treated as one millisecond.
    pub fn start_periodic(
        &mut self,
        kind: TimerKind,
        first_due_at_ms: u64,
        period_ms: u64,
        payload: P,
    ) -> TimerHandle {
        self.cancel(kind);
        self.insert(kind, first_due_at_ms, Some(period_ms.max(1)), payload)
    }

    /// Add a one-shot timer alongside existing timers of the same kind.
    pub fn schedule(&mut self, kind: TimerKind, due_at_ms: u64, payload: P) -> TimerHandle {
        self.insert(kind, due_at_ms, None, payload)
    }

    fn insert(
        &mut self,
        kind: TimerKind,
        due_at_ms: u64,
        period_ms: Option<u64>,
        payload: P,
    ) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        self.timers.push(Timer {
            handle,
            kind,
            due_at_ms,
            period_ms,
            payload,
        });
        handle
    }

    /// Cancel every live timer of `kind`, returning how many were dropped.
    pub fn cancel(&mut self, kind: TimerKind) -> usize {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.kind != kind);
        before - self.timers.len()
    }

    pub fn cancel_handle(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.handle != handle);
        before != self.timers.len()
    }

    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.timers.len();
        self.timers.clear();
        dropped
    }

    #[must_use]
    pub fn is_active(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|timer| timer.kind == kind)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub fn active_kinds(&self) -> Vec<TimerKind> {
        let mut kinds: Vec<TimerKind> = Vec::new();
        for timer in &self.timers {
            if !kinds.contains(&timer.kind) {
                kinds.push(timer.kind);
            }
        }
        kinds
    }

    /// Earliest due time across live timers.
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.timers.iter().map(|timer| timer.due_at_ms).min()
    }

    /// Remove and return the earliest timer due at or before `now_ms`.
    ///
    /// Ties go to the timer scheduled first. Periodic timers are re-armed
    /// one period later and a copy of their payload is returned; one that
    /// cannot be re-armed before the clock saturates fires a final time.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<FiredTimer<P>> {
        let position = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due_at_ms <= now_ms)
            .min_by_key(|(_, timer)| (timer.due_at_ms, timer.handle))
            .map(|(idx, _)| idx)?;

        let rearm_at = self.timers[position]
            .period_ms
            .and_then(|period| self.timers[position].due_at_ms.checked_add(period));
        if let Some(next_due) = rearm_at {
            let timer = &mut self.timers[position];
            let fired = FiredTimer {
                handle: timer.handle,
                kind: timer.kind,
                due_at_ms: timer.due_at_ms,
                payload: timer.payload.clone(),
            };
            timer.due_at_ms = next_due;
            return Some(fired);
        }

        let timer = self.timers.swap_remove(position);
        Some(FiredTimer {
            handle: timer.handle,
            kind: timer.kind,
            due_at_ms: timer.due_at_ms,
            payload: timer.payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_replaces_same_kind() {
        let mut timers: TimerRegistry<()> = TimerRegistry::new();
        timers.start(TimerKind::RageExpiry, 15_000, ());
        timers.start(TimerKind::RageExpiry, 20_000, ());
        assert_eq!(timers.active_count(), 1);
        assert_eq!(timers.next_due(), Some(20_000));
    }

    #[test]
    fn schedule_is_additive() {
        let mut timers = TimerRegistry::new();
        timers.schedule(TimerKind::Resolution, 10, 'a');
        timers.schedule(TimerKind::Resolution, 5, 'b');
        assert_eq!(timers.active_count(), 2);
        assert_eq!(timers.cancel(TimerKind::Resolution), 2);
        assert!(!timers.is_active(TimerKind::Resolution));
    }

    #[test]
    fn pop_due_orders_by_time_then_schedule() {
        let mut timers = TimerRegistry::new();
        timers.schedule(TimerKind::Resolution, 10, "second");
        timers.schedule(TimerKind::Resolution, 5, "first");
        timers.schedule(TimerKind::Resolution, 10, "third");
        timers.schedule(TimerKind::Resolution, 11, "late");

        let fired: Vec<&str> = std::iter::from_fn(|| timers.pop_due(10))
            .map(|timer| timer.payload)
            .collect();
        assert_eq!(fired, vec!["first", "second", "third"]);
        assert_eq!(timers.next_due(), Some(11));
    }

    #[test]
    fn periodic_timers_rearm_until_cancelled() {
        let mut timers = TimerRegistry::new();
        timers.start_periodic(TimerKind::RageTick, 100, 100, ());
        let ticks = std::iter::from_fn(|| timers.pop_due(350)).count();
        assert_eq!(ticks, 3);
        assert_eq!(timers.next_due(), Some(400));
        timers.cancel(TimerKind::RageTick);
        assert!(timers.pop_due(10_000).is_none());
    }

    #[test]
    fn periodic_timer_at_clock_end_fires_once_more() {
        let mut timers = TimerRegistry::new();
        timers.start_periodic(TimerKind::RageTick, u64::MAX - 50, 100, ());
        let ticks = std::iter::from_fn(|| timers.pop_due(u64::MAX)).count();
        assert_eq!(ticks, 1);
        assert_eq!(timers.active_count(), 0);
    }

    #[test]
    fn cancel_all_and_by_handle() {
        let mut timers = TimerRegistry::new();
        let bubble = timers.start(TimerKind::DamageBubble, 420, ());
        timers.start_periodic(TimerKind::BossIntro, 1_000, 1_000, ());
        assert_eq!(
            timers.active_kinds(),
            vec![TimerKind::DamageBubble, TimerKind::BossIntro]
        );
        assert!(timers.cancel_handle(bubble));
        assert!(!timers.cancel_handle(bubble));
        assert_eq!(timers.cancel_all(), 1);
        assert_eq!(timers.next_due(), None);
    }
}
