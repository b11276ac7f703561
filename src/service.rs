//! The assembled coordinator: one object wiring the store, roster,
//! resolver, engine, and spawn scheduler to the external collaborators.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::combat::{AttackOutcome, CombatResolver};
use crate::config::Config;
use crate::encounter::{EncounterStatus, EncounterStore};
use crate::engine::RetaliationEngine;
use crate::error::CombatError;
use crate::external::{AbilityCategory, Announcer, MoveLibrary, ParticipantId, ProfileStore};
use crate::observability::metrics;
use crate::roster::Roster;
use crate::spawn::SpawnCoordinator;

/// Facade over the whole encounter coordinator.
///
/// Embedders construct one of these per deployment, hand it the three
/// external collaborators, and route inbound commands to
/// [`resolve_attack`](Self::resolve_attack) and
/// [`trigger_counter_hazard`](Self::trigger_counter_hazard) while
/// [`run`](Self::run) drives spawning in the background.
pub struct WardenService {
    store: Arc<EncounterStore>,
    roster: Arc<Roster>,
    resolver: CombatResolver,
    engine: Arc<RetaliationEngine>,
    coordinator: SpawnCoordinator,
    shutdown: CancellationToken,
}

impl WardenService {
    /// Wires up every component against the given collaborators.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        profiles: Arc<dyn ProfileStore>,
        moves: Arc<dyn MoveLibrary>,
        announcer: Arc<dyn Announcer>,
        shutdown: CancellationToken,
    ) -> Self {
        let store = Arc::new(EncounterStore::new());
        let roster = Arc::new(Roster::new(config.roster.capacity));
        let engine = Arc::new(RetaliationEngine::new(
            Arc::clone(&store),
            Arc::clone(&roster),
            Arc::clone(&profiles),
            Arc::clone(&announcer),
            Arc::clone(&config),
        ));
        let resolver = CombatResolver::new(
            Arc::clone(&store),
            Arc::clone(&roster),
            Arc::clone(&profiles),
            moves,
            Arc::clone(&announcer),
            Arc::clone(&engine),
            Arc::clone(&config),
        );
        let coordinator = SpawnCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&roster),
            announcer,
            config,
            shutdown.clone(),
        );
        Self {
            store,
            roster,
            resolver,
            engine,
            coordinator,
            shutdown,
        }
    }

    /// Runs the spawn scheduler until the shutdown token fires.
    pub async fn run(&self) {
        metrics::describe_metrics();
        tracing::info!("encounter coordinator running");
        self.coordinator.run().await;
    }

    /// One immediate spawn attempt, outside the scheduler cadence.
    pub async fn try_spawn(&self) -> Option<Uuid> {
        self.coordinator.try_spawn().await
    }

    /// Routes an inbound ability command.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's [`CombatError`] rejections.
    pub async fn resolve_attack(
        &self,
        id: ParticipantId,
        category: AbilityCategory,
        move_number: u8,
    ) -> Result<AttackOutcome, CombatError> {
        self.resolver.resolve_attack(id, category, move_number).await
    }

    /// Routes an inbound counter-hazard command.
    ///
    /// # Errors
    ///
    /// Propagates the engine's [`CombatError`] rejections.
    pub async fn trigger_counter_hazard(
        &self,
        id: ParticipantId,
    ) -> Result<Duration, CombatError> {
        self.engine.trigger_counter_hazard(id).await
    }

    /// Snapshot of the live encounter for status displays, if any.
    #[must_use]
    pub fn status(&self) -> Option<EncounterStatus> {
        self.store
            .snapshot()
            .map(|b| b.status(Instant::now(), self.roster.len(), self.roster.capacity()))
    }

    /// Whether an encounter record currently exists.
    #[must_use]
    pub fn is_encounter_live(&self) -> bool {
        self.store.is_occupied()
    }

    /// The shutdown token shared by every background task.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

impl std::fmt::Debug for WardenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WardenService")
            .field("encounter_live", &self.is_encounter_live())
            .finish_non_exhaustive()
    }
}
