use super::simulation::Simulation;
use super::types::{GameEvent, ServerEvent, ServerState, WorldUpdate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Drives one room: drains inbound events, advances the simulation against wall-clock
/// time, then publishes the snapshot, point events and lifecycle state.
pub async fn world_task(
    mut simulation: Simulation,
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    events_tx: broadcast::Sender<ServerEvent>,
    server_state_tx: watch::Sender<ServerState>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) {
    let started = Instant::now();
    let mut interval = tokio::time::interval(tick_interval);
    // The simulation catches up from elapsed time on its own.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    publish_state(&server_state_tx, simulation.server_state());

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                // Exit cleanly when the lobby is removed.
                info!(tick = simulation.tick_count(), "world task shutting down");
                break;
            }
            _ = interval.tick() => {}
        }

        // Events are applied before the ticks so joins and leaves take effect at once.
        while let Ok(ev) = input_rx.try_recv() {
            simulation.handle_event(ev);
        }

        let now_ms = started.elapsed().as_millis() as u64;
        let ticks = simulation.advance(now_ms);

        for event in simulation.take_events() {
            // No subscribers is fine; events are best-effort.
            let _ = events_tx.send(event);
        }

        if ticks > 0 {
            let _ = world_tx.send(simulation.snapshot());
        }
        publish_state(&server_state_tx, simulation.server_state());
    }
}

fn publish_state(server_state_tx: &watch::Sender<ServerState>, next: ServerState) {
    server_state_tx.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        debug!(?next, "server state changed");
        *current = next;
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::SessionId;
    use crate::domain::tuning::Tuning;
    use crate::frameworks::physics::ArcadePhysics;
    use crate::use_cases::simulation::SimulationConfig;

    #[tokio::test]
    async fn when_player_joins_then_world_updates_include_their_characters() {
        let mut tuning = Tuning::default();
        tuning.world.obstacle_count = 0;
        let simulation = Simulation::new(
            SimulationConfig {
                tuning,
                ..SimulationConfig::default()
            },
            Box::new(ArcadePhysics::new()),
            0,
        );
        let (input_tx, input_rx) = mpsc::channel(16);
        let (world_tx, mut world_rx) = broadcast::channel(16);
        let (events_tx, mut events_rx) = broadcast::channel(16);
        let (state_tx, mut state_rx) = watch::channel(ServerState::Waiting);
        let shutdown = Arc::new(Notify::new());

        let task = tokio::spawn(world_task(
            simulation,
            input_rx,
            world_tx,
            events_tx,
            state_tx,
            Duration::from_millis(5),
            shutdown.clone(),
        ));

        input_tx
            .send(GameEvent::Join {
                session_id: SessionId(1),
                username: "alice".to_string(),
            })
            .await
            .unwrap();

        let update = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let update = world_rx.recv().await.unwrap();
                if update.entities.iter().filter(|e| e.as_player().is_some()).count() == 2 {
                    return update;
                }
            }
        })
        .await
        .expect("expected a world update with the joined characters");
        assert!(update.tick > 0);

        let joined = events_rx.recv().await.unwrap();
        assert!(matches!(joined, ServerEvent::Notification { target: None, .. }));
        tokio::time::timeout(
            Duration::from_secs(2),
            state_rx.wait_for(|s| matches!(s, ServerState::Running { .. })),
        )
        .await
        .expect("expected the room to report running")
        .unwrap();

        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("world task should stop")
            .unwrap();
    }
}
