//! Wall-clock driver for an [`EncounterSession`] on a single tokio task.
use std::future;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, sleep_until};

use crate::events::EmittedEvent;
use crate::numbers::millis_to_u64;
use crate::session::{EncounterSession, EncounterSnapshot};

/// Input forwarded from the presentation layer.
#[derive(Debug)]
pub enum Command {
    Select(usize),
    RestartStage,
    RestartQuiz,
    Snapshot(oneshot::Sender<EncounterSnapshot>),
    /// Stop driving; the session is torn down and returned.
    Teardown,
}

/// Drive `session` until a [`Command::Teardown`] arrives or the command
/// channel closes, forwarding every emitted event to `events`.
pub async fn run_session(
    mut session: EncounterSession,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedSender<EmittedEvent>,
) -> EncounterSession {
    let origin = Instant::now();
    let base_ms = session.now_ms();
    let elapsed_ms = || base_ms + millis_to_u64(origin.elapsed().as_millis());

    loop {
        forward(&mut session, &events);
        let deadline = session
            .next_deadline()
            .map(|due| origin + Duration::from_millis(due.saturating_sub(base_ms)));

        tokio::select! {
            command = commands.recv() => {
                session.advance_to(elapsed_ms());
                match command {
                    Some(Command::Select(choice)) => {
                        session.select_choice(choice);
                    }
                    Some(Command::RestartStage) => {
                        session.restart_stage();
                    }
                    Some(Command::RestartQuiz) => {
                        session.restart_quiz();
                    }
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(session.snapshot());
                    }
                    Some(Command::Teardown) | None => {
                        session.teardown();
                        break;
                    }
                }
            }
            () = wait_for(deadline) => {
                session.advance_to(elapsed_ms());
            }
        }
    }

    forward(&mut session, &events);
    session
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending::<()>().await,
    }
}

fn forward(session: &mut EncounterSession, events: &mpsc::UnboundedSender<EmittedEvent>) {
    for event in session.drain_events() {
        if events.send(event).is_err() {
            log::trace!("event listener dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BattleConfig;
    use crate::data::QuizItem;
    use crate::events::BattleEvent;
    use crate::rng::ScriptedSource;
    use crate::roster::UniformClock;
    use crate::state::Outcome;

    fn open(config: BattleConfig) -> EncounterSession {
        let items = vec![QuizItem::new("p < 0.05?", &["reject", "keep"], 0, ""); 17];
        EncounterSession::from_sequence(
            items,
            config,
            Box::new(ScriptedSource::default()),
            Box::new(UniformClock::default()),
        )
        .into_session()
        .unwrap()
    }

    async fn snapshot(commands: &mpsc::Sender<Command>) -> EncounterSnapshot {
        let (tx, rx) = oneshot::channel();
        commands.send(Command::Snapshot(tx)).await.unwrap();
        rx.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_answer_lands_after_attack_animation() {
        let (command_tx, command_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(run_session(
            open(BattleConfig::default()),
            command_rx,
            event_tx,
        ));

        command_tx.send(Command::Select(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        let snap = snapshot(&command_tx).await;
        assert_eq!(snap.player_lives, 4);
        assert!(!snap.input_locked);

        command_tx.send(Command::Teardown).await.unwrap();
        let session = driver.await.unwrap();
        assert!(session.is_torn_down());

        let mut saw_bubble = false;
        while let Ok(emitted) = event_rx.try_recv() {
            if let BattleEvent::DamageBubble { amount, .. } = emitted.event {
                assert_eq!(emitted.at_ms, 800);
                assert_eq!(amount, 1);
                saw_bubble = true;
            }
        }
        assert!(saw_bubble);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_boss_unleashes_rage_once() {
        let config = BattleConfig {
            stage_health: vec![3],
            ..BattleConfig::default()
        };
        let (command_tx, command_rx) = mpsc::channel(8);
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(run_session(open(config), command_rx, event_tx));

        tokio::time::sleep(Duration::from_millis(60_000)).await;
        let snap = snapshot(&command_tx).await;
        assert_eq!(snap.player_lives, 1);
        assert!(snap.rage_performed);
        assert_eq!(snap.outcome, None::<Outcome>);

        drop(command_tx);
        let session = driver.await.unwrap();
        assert!(session.is_torn_down());
    }
}
