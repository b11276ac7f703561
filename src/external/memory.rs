//! In-memory collaborator implementations.
//!
//! Used by the integration tests and the `simulate` command. The profile
//! store keeps each profile behind its own `DashMap` shard so the
//! conditional energy spend is atomic per participant, matching what a
//! real backing store provides.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use dashmap::DashMap;

use crate::error::ExternalError;
use crate::external::{
    AbilityCategory, Announcer, EnergySpend, MoveDef, MoveLibrary, ParticipantId, PlayerProfile,
    ProfileStore,
};

// ============================================================================
// MemoryProfiles
// ============================================================================

/// `DashMap`-backed profile store.
#[derive(Debug, Default)]
pub struct MemoryProfiles {
    profiles: DashMap<ParticipantId, PlayerProfile>,
}

impl MemoryProfiles {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a profile.
    pub fn insert(&self, id: ParticipantId, profile: PlayerProfile) {
        self.profiles.insert(id, profile);
    }

    /// Builds a profile with a standard loadout, for tests and simulation.
    #[must_use]
    pub fn standard_profile(attack: u32) -> PlayerProfile {
        let mut loadout = HashMap::new();
        loadout.insert(AbilityCategory::Technique, "Crimson Ward".to_string());
        loadout.insert(AbilityCategory::Weapon, "Ashfang Blade".to_string());
        loadout.insert(AbilityCategory::Style, "Stonebreaker Form".to_string());
        PlayerProfile {
            health: 250,
            max_health: 250,
            energy: 400,
            attack,
            loadout,
        }
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryProfiles {
    async fn fetch(&self, id: ParticipantId) -> Result<PlayerProfile, ExternalError> {
        self.profiles
            .get(&id)
            .map(|p| p.clone())
            .ok_or(ExternalError::UnknownParticipant(id))
    }

    async fn apply_health_delta(
        &self,
        id: ParticipantId,
        delta: i64,
    ) -> Result<u32, ExternalError> {
        let mut entry = self
            .profiles
            .get_mut(&id)
            .ok_or(ExternalError::UnknownParticipant(id))?;
        let current = i64::from(entry.health);
        let max = i64::from(entry.max_health);
        let next = (current + delta).clamp(0, max);
        entry.health = u32::try_from(next).unwrap_or(0);
        Ok(entry.health)
    }

    async fn set_health(&self, id: ParticipantId, value: u32) -> Result<(), ExternalError> {
        let mut entry = self
            .profiles
            .get_mut(&id)
            .ok_or(ExternalError::UnknownParticipant(id))?;
        entry.health = value.min(entry.max_health);
        Ok(())
    }

    async fn try_spend_energy(
        &self,
        id: ParticipantId,
        cost: u32,
    ) -> Result<EnergySpend, ExternalError> {
        let mut entry = self
            .profiles
            .get_mut(&id)
            .ok_or(ExternalError::UnknownParticipant(id))?;
        if entry.energy < cost {
            return Ok(EnergySpend::Short {
                available: entry.energy,
            });
        }
        entry.energy -= cost;
        Ok(EnergySpend::Spent)
    }

    async fn refund_energy(&self, id: ParticipantId, amount: u32) -> Result<(), ExternalError> {
        let mut entry = self
            .profiles
            .get_mut(&id)
            .ok_or(ExternalError::UnknownParticipant(id))?;
        entry.energy = entry.energy.saturating_add(amount);
        Ok(())
    }
}

// ============================================================================
// StaticMoves
// ============================================================================

/// Fixed move table keyed by `(item, move number)`.
#[derive(Debug, Default)]
pub struct StaticMoves {
    moves: HashMap<(String, u8), MoveDef>,
}

impl StaticMoves {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a move, replacing any previous definition for the key.
    #[must_use]
    pub fn with_move(mut self, item: &str, number: u8, def: MoveDef) -> Self {
        self.moves.insert((item.to_string(), number), def);
        self
    }

    /// Builds the standard kit matching [`MemoryProfiles::standard_profile`]:
    /// three moves per item, cost and cooldown scaling with the move number.
    #[must_use]
    pub fn standard_kit() -> Self {
        let mut lib = Self::new();
        for item in ["Crimson Ward", "Ashfang Blade", "Stonebreaker Form"] {
            for number in 1..=3u8 {
                lib = lib.with_move(
                    item,
                    number,
                    MoveDef {
                        title: format!("{item} {number}"),
                        damage: 20 * u32::from(number),
                        energy_cost: 25 * u32::from(number),
                        cooldown: Duration::from_secs(3 * u64::from(number)),
                    },
                );
            }
        }
        lib
    }
}

#[async_trait::async_trait]
impl MoveLibrary for StaticMoves {
    async fn resolve(
        &self,
        item: &str,
        move_number: u8,
    ) -> Result<Option<MoveDef>, ExternalError> {
        Ok(self.moves.get(&(item.to_string(), move_number)).cloned())
    }
}

// ============================================================================
// Announcers
// ============================================================================

/// Announcer that emits every broadcast as a tracing event.
#[derive(Debug, Default)]
pub struct TracingAnnouncer;

#[async_trait::async_trait]
impl Announcer for TracingAnnouncer {
    async fn post(&self, text: &str) {
        tracing::info!(target: "raidwarden::announce", "{text}");
    }

    async fn revoke_voice(&self, id: ParticipantId, duration: Duration) {
        tracing::info!(
            target: "raidwarden::announce",
            participant = %id,
            seconds = duration.as_secs(),
            "voice revoked"
        );
    }

    async fn restore_voice(&self, id: ParticipantId) {
        tracing::info!(target: "raidwarden::announce", participant = %id, "voice restored");
    }
}

/// Announcer that records everything for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingAnnouncer {
    posts: Mutex<Vec<String>>,
    revoked: Mutex<Vec<ParticipantId>>,
    restored: Mutex<Vec<ParticipantId>>,
}

impl RecordingAnnouncer {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All posts so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn posts(&self) -> Vec<String> {
        self.posts.lock().expect("posts lock poisoned").clone()
    }

    /// Whether any post contains the given fragment.
    #[must_use]
    pub fn saw(&self, fragment: &str) -> bool {
        self.posts().iter().any(|p| p.contains(fragment))
    }

    /// Participants whose voice was revoked, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn revoked(&self) -> Vec<ParticipantId> {
        self.revoked.lock().expect("revoked lock poisoned").clone()
    }

    /// Participants whose voice was restored, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn restored(&self) -> Vec<ParticipantId> {
        self.restored.lock().expect("restored lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl Announcer for RecordingAnnouncer {
    async fn post(&self, text: &str) {
        self.posts
            .lock()
            .expect("posts lock poisoned")
            .push(text.to_string());
    }

    async fn revoke_voice(&self, id: ParticipantId, _duration: Duration) {
        self.revoked.lock().expect("revoked lock poisoned").push(id);
    }

    async fn restore_voice(&self, id: ParticipantId) {
        self.restored
            .lock()
            .expect("restored lock poisoned")
            .push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: ParticipantId = ParticipantId(1);

    #[tokio::test]
    async fn health_delta_clamps_at_zero_and_max() {
        let store = MemoryProfiles::new();
        store.insert(ALICE, MemoryProfiles::standard_profile(25));

        let after = store.apply_health_delta(ALICE, -10_000).await.expect("ok");
        assert_eq!(after, 0);

        let after = store.apply_health_delta(ALICE, 10_000).await.expect("ok");
        assert_eq!(after, 250);
    }

    #[tokio::test]
    async fn energy_spend_is_conditional() {
        let store = MemoryProfiles::new();
        store.insert(ALICE, MemoryProfiles::standard_profile(25));

        assert_eq!(
            store.try_spend_energy(ALICE, 399).await.expect("ok"),
            EnergySpend::Spent
        );
        assert_eq!(
            store.try_spend_energy(ALICE, 2).await.expect("ok"),
            EnergySpend::Short { available: 1 }
        );
        // The failed spend deducted nothing.
        assert_eq!(store.fetch(ALICE).await.expect("ok").energy, 1);
    }

    #[tokio::test]
    async fn refund_restores_spent_energy() {
        let store = MemoryProfiles::new();
        store.insert(ALICE, MemoryProfiles::standard_profile(25));
        store.try_spend_energy(ALICE, 100).await.expect("ok");
        store.refund_energy(ALICE, 100).await.expect("ok");
        assert_eq!(store.fetch(ALICE).await.expect("ok").energy, 400);
    }

    #[tokio::test]
    async fn unknown_participant_is_an_error() {
        let store = MemoryProfiles::new();
        assert!(store.fetch(ParticipantId(99)).await.is_err());
    }

    #[tokio::test]
    async fn standard_kit_scales_with_move_number() {
        let lib = StaticMoves::standard_kit();
        let one = lib.resolve("Crimson Ward", 1).await.expect("ok").expect("some");
        let three = lib.resolve("Crimson Ward", 3).await.expect("ok").expect("some");
        assert!(three.damage > one.damage);
        assert!(three.energy_cost > one.energy_cost);
        assert!(three.cooldown > one.cooldown);
        assert!(lib.resolve("Crimson Ward", 4).await.expect("ok").is_none());
    }
}
