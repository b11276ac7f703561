//! Spawn scheduling: at most one live encounter, exactly-once creation.

pub mod monitor;

use std::sync::Arc;

use rand::Rng;
use rand::seq::IndexedRandom;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Config;
use crate::encounter::{BossEncounter, EncounterStore, health_bar};
use crate::external::Announcer;
use crate::observability::metrics;
use crate::roster::Roster;

/// Periodically tries to bring a boss into the world.
///
/// The spawn lock is the sole defense against duplicate spawns from
/// overlapping ticks; everything after acquisition is fallible-safe
/// because the lock guard releases on every exit path.
pub struct SpawnCoordinator {
    store: Arc<EncounterStore>,
    roster: Arc<Roster>,
    announcer: Arc<dyn Announcer>,
    config: Arc<Config>,
    shutdown: CancellationToken,
}

impl SpawnCoordinator {
    /// Wires the coordinator to its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<EncounterStore>,
        roster: Arc<Roster>,
        announcer: Arc<dyn Announcer>,
        config: Arc<Config>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            roster,
            announcer,
            config,
            shutdown,
        }
    }

    /// Tick loop; runs until the shutdown token fires.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.spawn.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    tracing::info!("spawn scheduler stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.try_spawn().await;
                }
            }
        }
    }

    /// One spawn attempt.
    ///
    /// Returns the new encounter's id, or `None` when the lock was held,
    /// an encounter is already live, or no templates are configured. All
    /// `None` outcomes are internal control flow, retried next tick.
    pub async fn try_spawn(&self) -> Option<Uuid> {
        let _guard = self
            .store
            .try_acquire_spawn_lock(self.config.spawn.lock_ttl)?;
        if self.store.is_occupied() {
            return None;
        }

        let (boss, buff_pct) = {
            let mut rng = rand::rng();
            let template = self.config.bosses.choose(&mut rng)?;
            let buff_pct =
                rng.random_range(self.config.spawn.buff_min_pct..=self.config.spawn.buff_max_pct);
            (
                BossEncounter::from_template(template, f64::from(buff_pct) / 100.0),
                buff_pct,
            )
        };
        let id = boss.id;
        let name = boss.name.clone();
        let max_health = boss.max_health;

        // Per-encounter state from any previous fight must not leak in.
        self.roster.clear();
        let session = self.store.install(boss);

        metrics::record_spawn();
        metrics::set_roster_size(0);
        tracing::info!(boss = %name, max_health, buff_pct, session, "encounter spawned");
        self.announcer
            .post(&format!(
                "A wild {name} appears, {buff_pct}% empowered!\n{} {max_health}/{max_health}",
                health_bar(max_health, max_health),
            ))
            .await;

        tokio::spawn(monitor::watch(
            Arc::clone(&self.store),
            Arc::clone(&self.roster),
            Arc::clone(&self.announcer),
            id,
            session,
            self.config.monitor.clone(),
            self.shutdown.clone(),
        ));

        Some(id)
    }
}

impl std::fmt::Debug for SpawnCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnCoordinator").finish_non_exhaustive()
    }
}
