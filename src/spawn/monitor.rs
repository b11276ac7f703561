//! Idle-despawn monitor, one per spawned encounter.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::schema::MonitorConfig;
use crate::encounter::EncounterStore;
use crate::external::Announcer;
use crate::observability::metrics;
use crate::roster::Roster;

/// Watches one encounter for inactivity.
///
/// The loop wakes every `poll_interval` and stops on the first of: the
/// session token superseded by a newer spawn, the encounter gone or
/// fought to zero, the shutdown token fired, or the idle timeout tripped,
/// in which case it despawns the encounter itself. A stale monitor makes
/// no mutations after the poll that detects supersession.
pub async fn watch(
    store: Arc<EncounterStore>,
    roster: Arc<Roster>,
    announcer: Arc<dyn Announcer>,
    encounter_id: Uuid,
    session: u64,
    config: MonitorConfig,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => return,
            () = tokio::time::sleep(config.poll_interval) => {}
        }

        if store.session() != session {
            tracing::debug!(session, "monitor superseded, stopping");
            return;
        }
        let Some(boss) = store.snapshot() else {
            return;
        };
        if boss.id != encounter_id || (boss.current_health == 0 && !boss.transitioning) {
            return;
        }

        if store.idle_for() >= config.idle_timeout {
            if store.clear_if(encounter_id).is_some() {
                roster.clear();
                metrics::record_despawn("idle");
                metrics::set_roster_size(0);
                tracing::info!(boss = %boss.name, "encounter despawned from inactivity");
                announcer
                    .post(&format!(
                        "{} grew bored of waiting and vanished. The encounter is over.",
                        boss.name,
                    ))
                    .await;
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::Config;
    use crate::config::schema::{BossTemplate, HazardTemplate};
    use crate::encounter::BossEncounter;
    use crate::external::memory::RecordingAnnouncer;

    fn boss() -> BossEncounter {
        BossEncounter::from_template(
            &BossTemplate {
                name: "Hollow Sovereign".to_string(),
                max_health: 1000,
                base_damage: 50,
                phase_count: 2,
                moves: vec![],
                hazard: HazardTemplate::default(),
            },
            0.0,
        )
    }

    fn monitor_config() -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_secs(25),
            idle_timeout: Duration::from_secs(240),
        }
    }

    struct Harness {
        store: Arc<EncounterStore>,
        roster: Arc<Roster>,
        announcer: Arc<RecordingAnnouncer>,
        shutdown: CancellationToken,
    }

    fn harness() -> Harness {
        Harness {
            store: Arc::new(EncounterStore::new()),
            roster: Arc::new(Roster::new(Config::default().roster.capacity)),
            announcer: Arc::new(RecordingAnnouncer::new()),
            shutdown: CancellationToken::new(),
        }
    }

    fn spawn_watch(h: &Harness, encounter_id: Uuid, session: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(watch(
            Arc::clone(&h.store),
            Arc::clone(&h.roster),
            Arc::clone(&h.announcer) as Arc<dyn Announcer>,
            encounter_id,
            session,
            monitor_config(),
            h.shutdown.clone(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn an_idle_encounter_is_despawned() {
        let h = harness();
        let b = boss();
        let id = b.id;
        let session = h.store.install(b);
        let handle = spawn_watch(&h, id, session);

        tokio::time::advance(Duration::from_secs(250)).await;
        handle.await.expect("monitor finished");

        assert!(h.store.snapshot().is_none());
        assert!(h.announcer.saw("vanished"));
    }

    #[tokio::test(start_paused = true)]
    async fn activity_defers_the_despawn() {
        let h = harness();
        let b = boss();
        let id = b.id;
        let session = h.store.install(b);
        let handle = spawn_watch(&h, id, session);

        for _ in 0..8 {
            tokio::time::advance(Duration::from_secs(30)).await;
            h.store.touch();
        }
        assert!(h.store.is_occupied());

        tokio::time::advance(Duration::from_secs(250)).await;
        handle.await.expect("monitor finished");
        assert!(h.store.snapshot().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn a_superseded_monitor_stops_without_mutating() {
        let h = harness();
        let b = boss();
        let stale_id = b.id;
        let stale_session = h.store.install(b);
        let handle = spawn_watch(&h, stale_id, stale_session);

        // A newer spawn replaces the encounter and bumps the session.
        let newer = boss();
        let newer_id = newer.id;
        h.store.install(newer);

        tokio::time::advance(Duration::from_secs(500)).await;
        handle.await.expect("stale monitor finished");

        // The new encounter is untouched by the stale monitor.
        assert_eq!(h.store.snapshot().expect("still live").id, newer_id);
        assert!(h.announcer.posts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn a_won_encounter_needs_no_despawn() {
        let h = harness();
        let b = boss();
        let id = b.id;
        let session = h.store.install(b);
        let handle = spawn_watch(&h, id, session);

        h.store.clear_if(id);
        tokio::time::advance(Duration::from_secs(30)).await;
        handle.await.expect("monitor finished");
        assert!(h.announcer.posts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn a_transitioning_boss_at_zero_health_is_not_abandoned() {
        let h = harness();
        let mut b = boss();
        b.current_health = 0;
        b.transitioning = true;
        let id = b.id;
        let session = h.store.install(b);
        let handle = spawn_watch(&h, id, session);

        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        h.shutdown.cancel();
        handle.await.expect("monitor finished");
        assert!(h.store.is_occupied());
    }
}
