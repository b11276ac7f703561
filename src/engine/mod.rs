//! Boss-side behavior: retaliation, hazard unleashes, phase transitions,
//! the counter-hazard freeze, and incapacitation lockouts.
//!
//! Every entry point re-reads the encounter under the store lock before
//! mutating, so a despawn or phase change that races a scheduled action
//! makes the action a quiet no-op rather than a stale write.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::seq::IndexedRandom;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::Config;
use crate::encounter::{EncounterStore, Phase};
use crate::error::CombatError;
use crate::external::{AbilityCategory, Announcer, EnergySpend, ParticipantId, ProfileStore};
use crate::observability::metrics;
use crate::roster::Roster;

/// Scales a base value by a floating multiplier, truncating the fraction.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn scaled(base: u32, multiplier: f64) -> u32 {
    (f64::from(base) * multiplier).floor().max(0.0) as u32
}

/// Applies symmetric random variance to a base value.
pub(crate) fn vary(base: u32, variance: f64, rng: &mut impl Rng) -> u32 {
    scaled(base, rng.random_range((1.0 - variance)..=(1.0 + variance)))
}

// ============================================================================
// RetaliationEngine
// ============================================================================

/// Drives everything the boss does back to the roster.
pub struct RetaliationEngine {
    store: Arc<EncounterStore>,
    roster: Arc<Roster>,
    profiles: Arc<dyn ProfileStore>,
    announcer: Arc<dyn Announcer>,
    config: Arc<Config>,
}

impl RetaliationEngine {
    /// Wires the engine to its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<EncounterStore>,
        roster: Arc<Roster>,
        profiles: Arc<dyn ProfileStore>,
        announcer: Arc<dyn Announcer>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            roster,
            profiles,
            announcer,
            config,
        }
    }

    // ------------------------------------------------------------------
    // Retaliation
    // ------------------------------------------------------------------

    /// Waits out the narrative delay, then retaliates.
    pub async fn retaliate_after_delay(&self, encounter_id: Uuid) {
        tokio::time::sleep(self.config.combat.retaliation_delay).await;
        self.retaliate(encounter_id).await;
    }

    /// Strikes every engaged participant with varied base damage.
    ///
    /// Quiet no-op when the encounter is gone, frozen, mid-transition, or
    /// the roster is empty. The roster is snapshotted once; participants
    /// engaging afterwards are not hit by this strike.
    pub async fn retaliate(&self, encounter_id: Uuid) {
        let Some(boss) = self.store.snapshot() else {
            return;
        };
        if boss.id != encounter_id || boss.current_health == 0 || boss.transitioning {
            return;
        }
        if boss.is_frozen(Instant::now()) {
            tracing::debug!(boss = %boss.name, "retaliation suppressed while frozen");
            return;
        }
        let targets = self.roster.snapshot();
        if targets.is_empty() {
            return;
        }

        let (move_name, hits) = {
            let mut rng = rand::rng();
            let name = boss
                .moves
                .choose(&mut rng)
                .cloned()
                .unwrap_or_else(|| "a crushing blow".to_string());
            let hits: Vec<(ParticipantId, u32)> = targets
                .iter()
                .map(|t| (t.id, vary(boss.base_damage, self.config.combat.variance, &mut rng)))
                .collect();
            (name, hits)
        };

        self.announcer
            .post(&format!(
                "{} lashes out with {move_name}, striking {} attacker(s)!",
                boss.name,
                hits.len(),
            ))
            .await;

        for (id, damage) in hits {
            self.strike_participant(id, damage).await;
        }
    }

    /// Applies boss damage to one participant, mirroring the delta to the
    /// profile store and incapacitating on zero.
    async fn strike_participant(&self, id: ParticipantId, damage: u32) {
        let Some(after) = self.roster.apply_damage(id, damage) else {
            return;
        };
        if let Err(err) = self.profiles.apply_health_delta(id, -i64::from(damage)).await {
            tracing::warn!(participant = %id, error = %err, "health delta failed");
        }
        tracing::debug!(participant = %id, damage, health = after, "participant struck");
        if after == 0 {
            self.incapacitate(id).await;
        }
    }

    // ------------------------------------------------------------------
    // Hazard
    // ------------------------------------------------------------------

    /// Applies the one-shot hazard burst to every engaged participant.
    ///
    /// The charge has already been consumed and the ongoing penalty armed
    /// under the store lock by the caller; this applies the burst damage
    /// to the roster snapshot and announces it.
    pub async fn unleash_hazard(&self, encounter_id: Uuid) {
        let Some(boss) = self.store.snapshot() else {
            return;
        };
        if boss.id != encounter_id {
            return;
        }
        let targets = self.roster.snapshot();

        metrics::record_hazard();
        self.announcer
            .post(&format!(
                "{} unleashes its domain! The field warps, searing every attacker for {} damage.",
                boss.name, boss.hazard.damage,
            ))
            .await;

        for target in targets {
            self.strike_participant(target.id, boss.hazard.damage).await;
        }
    }

    // ------------------------------------------------------------------
    // Phase transition
    // ------------------------------------------------------------------

    /// Resurrects the boss into the next phase after the narrative delay.
    ///
    /// Guarded: the resurrection applies only if the same encounter is
    /// still installed, still at zero health, and still in `from`. A
    /// despawn during the delay makes this a no-op.
    pub async fn begin_phase_transition(&self, encounter_id: Uuid, from: Phase) {
        tokio::time::sleep(self.config.phases.transition_delay).await;

        let Some(next) = from.next() else {
            return;
        };
        let health_mult = self.config.phases.health_multiplier;
        let damage_mult = self.config.phases.damage_multiplier;

        let resurrected = self.store.update(|boss| {
            if boss.id != encounter_id
                || boss.phase != from
                || boss.current_health != 0
                || !boss.transitioning
            {
                return None;
            }
            boss.max_health = scaled(boss.max_health, health_mult);
            boss.current_health = boss.max_health;
            boss.base_damage = scaled(boss.base_damage, damage_mult);
            boss.phase = next;
            boss.hazard.active = false;
            boss.frozen_until = None;
            boss.transitioning = false;
            Some((boss.name.clone(), boss.max_health))
        });

        if let Some(Some((name, max_health))) = resurrected {
            metrics::record_phase_transition();
            tracing::info!(boss = %name, phase = %next, max_health, "phase transition");
            self.announcer
                .post(&format!(
                    "{name} refuses to fall! It rises again at {max_health} health. {next} begins."
                ))
                .await;
        }
    }

    // ------------------------------------------------------------------
    // Counter-hazard
    // ------------------------------------------------------------------

    /// Freezes the boss for the configured duration, charged to the
    /// triggering participant's energy pool.
    ///
    /// The freeze is claimed under the store lock first; if the energy
    /// spend then comes up short, the claim is unwound so a rejected
    /// attempt leaves no trace.
    ///
    /// # Errors
    ///
    /// Rejects when no encounter is live, the participant is down or has
    /// no technique equipped, a freeze is already in effect, or energy is
    /// insufficient.
    pub async fn trigger_counter_hazard(
        &self,
        id: ParticipantId,
    ) -> Result<Duration, CombatError> {
        let profile = self.profiles.fetch(id).await.map_err(CombatError::from)?;
        if profile.health == 0 {
            return Err(CombatError::Incapacitated);
        }
        let technique = profile
            .loadout
            .get(&AbilityCategory::Technique)
            .cloned()
            .ok_or(CombatError::NoItemEquipped {
                category: AbilityCategory::Technique,
            })?;

        let duration = self.config.freeze.duration;
        let claimed = self
            .store
            .update(|boss| {
                if boss.current_health == 0 {
                    return Err(CombatError::NoActiveEncounter);
                }
                let now = Instant::now();
                if let Some(until) = boss.frozen_until
                    && until > now
                {
                    return Err(CombatError::AlreadyFrozen {
                        remaining: until - now,
                    });
                }
                boss.frozen_until = Some(now + duration);
                Ok((boss.id, boss.name.clone()))
            })
            .ok_or(CombatError::NoActiveEncounter)?;
        let (encounter_id, boss_name) = claimed?;

        let cost = self.config.freeze.energy_cost;
        match self.profiles.try_spend_energy(id, cost).await {
            Ok(EnergySpend::Spent) => {}
            Ok(EnergySpend::Short { available }) => {
                self.unfreeze(encounter_id);
                return Err(CombatError::InsufficientResource {
                    required: cost,
                    available,
                });
            }
            Err(err) => {
                self.unfreeze(encounter_id);
                return Err(err.into());
            }
        }

        self.store.touch();
        metrics::record_freeze();
        self.announcer
            .post(&format!(
                "{id} counters with {technique}! {boss_name} is frozen for {}s.",
                duration.as_secs(),
            ))
            .await;

        self.spawn_clash_watcher(encounter_id, boss_name);
        Ok(duration)
    }

    fn unfreeze(&self, encounter_id: Uuid) {
        self.store.update(|boss| {
            if boss.id == encounter_id {
                boss.frozen_until = None;
            }
        });
    }

    /// Periodically rolls for a clash that shatters the freeze early.
    fn spawn_clash_watcher(&self, encounter_id: Uuid, boss_name: String) {
        let store = Arc::clone(&self.store);
        let announcer = Arc::clone(&self.announcer);
        let interval = self.config.freeze.clash_interval;
        let chance = self.config.freeze.clash_chance;

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(boss) = store.snapshot() else {
                    return;
                };
                if boss.id != encounter_id || !boss.is_frozen(Instant::now()) {
                    return;
                }
                if rand::rng().random_bool(chance) {
                    let shattered = store.update(|b| {
                        if b.id == encounter_id && b.frozen_until.is_some() {
                            b.frozen_until = None;
                            true
                        } else {
                            false
                        }
                    });
                    if shattered == Some(true) {
                        metrics::record_clash();
                        announcer
                            .post(&format!(
                                "{boss_name} clashes through the counter! The freeze shatters."
                            ))
                            .await;
                    }
                    return;
                }
            }
        });
    }

    // ------------------------------------------------------------------
    // Incapacitation
    // ------------------------------------------------------------------

    /// Removes a defeated participant, revokes their voice, and schedules
    /// the lockout-end restore.
    ///
    /// The slot frees immediately; the restore runs as its own deferred
    /// task so concurrent incapacitations never interfere.
    pub async fn incapacitate(&self, id: ParticipantId) {
        if self.roster.remove(id).is_none() {
            return;
        }
        let streak = self.roster.record_defeat(id);
        let lockout = self.config.roster.lockout;
        let recovery = self.config.roster.recovery_health;

        metrics::record_incapacitation();
        metrics::set_roster_size(self.roster.len());
        tracing::info!(participant = %id, streak, "participant incapacitated");

        self.announcer.revoke_voice(id, lockout).await;
        self.announcer
            .post(&format!("{id} has been incapacitated! Down for {}s.", lockout.as_secs()))
            .await;

        let profiles = Arc::clone(&self.profiles);
        let announcer = Arc::clone(&self.announcer);
        tokio::spawn(async move {
            tokio::time::sleep(lockout).await;
            if let Err(err) = profiles.set_health(id, recovery).await {
                tracing::warn!(participant = %id, error = %err, "lockout recovery failed");
            }
            announcer.restore_voice(id).await;
        });
    }
}

impl std::fmt::Debug for RetaliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetaliationEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BossTemplate, HazardTemplate};
    use crate::encounter::BossEncounter;
    use crate::external::memory::{MemoryProfiles, RecordingAnnouncer};
    use crate::roster::Participant;

    const ALICE: ParticipantId = ParticipantId(1);
    const BOB: ParticipantId = ParticipantId(2);

    struct Harness {
        store: Arc<EncounterStore>,
        roster: Arc<Roster>,
        profiles: Arc<MemoryProfiles>,
        announcer: Arc<RecordingAnnouncer>,
        engine: RetaliationEngine,
    }

    fn harness(config: Config) -> Harness {
        let store = Arc::new(EncounterStore::new());
        let roster = Arc::new(Roster::new(config.roster.capacity));
        let profiles = Arc::new(MemoryProfiles::new());
        let announcer = Arc::new(RecordingAnnouncer::new());
        let engine = RetaliationEngine::new(
            Arc::clone(&store),
            Arc::clone(&roster),
            Arc::clone(&profiles) as Arc<dyn ProfileStore>,
            Arc::clone(&announcer) as Arc<dyn Announcer>,
            Arc::new(config),
        );
        Harness {
            store,
            roster,
            profiles,
            announcer,
            engine,
        }
    }

    fn template() -> BossTemplate {
        BossTemplate {
            name: "Hollow Sovereign".to_string(),
            max_health: 1000,
            base_damage: 50,
            phase_count: 2,
            moves: vec!["Rending Howl".to_string()],
            hazard: HazardTemplate {
                uses: 1,
                damage: 120,
            },
        }
    }

    fn engage(h: &Harness, id: ParticipantId) {
        h.profiles.insert(id, MemoryProfiles::standard_profile(25));
        h.roster
            .admit(Participant::from_profile(id, &MemoryProfiles::standard_profile(25)))
            .expect("admitted");
    }

    #[tokio::test]
    async fn retaliation_hits_every_engaged_participant() {
        let mut config = Config::default();
        config.combat.variance = 0.0;
        let h = harness(config);
        let boss = BossEncounter::from_template(&template(), 0.0);
        let id = boss.id;
        h.store.install(boss);
        engage(&h, ALICE);
        engage(&h, BOB);

        h.engine.retaliate(id).await;

        assert_eq!(h.roster.get(ALICE).expect("engaged").current_health, 200);
        assert_eq!(h.roster.get(BOB).expect("engaged").current_health, 200);
        assert_eq!(h.profiles.fetch(ALICE).await.expect("ok").health, 200);
        assert!(h.announcer.saw("Rending Howl"));
    }

    #[tokio::test]
    async fn retaliation_is_suppressed_while_frozen() {
        let h = harness(Config::default());
        let mut boss = BossEncounter::from_template(&template(), 0.0);
        boss.frozen_until = Some(Instant::now() + Duration::from_secs(60));
        let id = boss.id;
        h.store.install(boss);
        engage(&h, ALICE);

        h.engine.retaliate(id).await;

        assert_eq!(h.roster.get(ALICE).expect("engaged").current_health, 250);
        assert!(h.announcer.posts().is_empty());
    }

    #[tokio::test]
    async fn retaliation_against_a_superseded_encounter_is_a_no_op() {
        let h = harness(Config::default());
        let stale = Uuid::new_v4();
        h.store.install(BossEncounter::from_template(&template(), 0.0));
        engage(&h, ALICE);

        h.engine.retaliate(stale).await;

        assert_eq!(h.roster.get(ALICE).expect("engaged").current_health, 250);
    }

    #[tokio::test(start_paused = true)]
    async fn lethal_retaliation_incapacitates_and_restores() {
        let mut config = Config::default();
        config.combat.variance = 0.0;
        config.roster.lockout = Duration::from_secs(10);
        config.roster.recovery_health = 50;
        let h = harness(config);
        let mut tpl = template();
        tpl.base_damage = 400;
        let boss = BossEncounter::from_template(&tpl, 0.0);
        let id = boss.id;
        h.store.install(boss);
        engage(&h, ALICE);

        h.engine.retaliate(id).await;
        // Let the spawned restore task register its timer first.
        tokio::task::yield_now().await;

        assert!(!h.roster.contains(ALICE));
        assert_eq!(h.roster.streak(ALICE), 1);
        assert_eq!(h.announcer.revoked(), vec![ALICE]);
        assert_eq!(h.profiles.fetch(ALICE).await.expect("ok").health, 0);

        tokio::time::advance(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;

        assert_eq!(h.announcer.restored(), vec![ALICE]);
        assert_eq!(h.profiles.fetch(ALICE).await.expect("ok").health, 50);
    }

    #[tokio::test]
    async fn hazard_burst_hits_the_whole_roster() {
        let h = harness(Config::default());
        let boss = BossEncounter::from_template(&template(), 0.0);
        let id = boss.id;
        h.store.install(boss);
        engage(&h, ALICE);
        engage(&h, BOB);

        h.engine.unleash_hazard(id).await;

        assert_eq!(h.roster.get(ALICE).expect("engaged").current_health, 130);
        assert_eq!(h.roster.get(BOB).expect("engaged").current_health, 130);
        assert!(h.announcer.saw("domain"));
    }

    #[tokio::test(start_paused = true)]
    async fn phase_transition_amplifies_and_resets() {
        let mut config = Config::default();
        config.phases.health_multiplier = 2.5;
        config.phases.damage_multiplier = 1.3;
        let h = harness(config);
        let mut boss = BossEncounter::from_template(&template(), 0.0);
        boss.current_health = 0;
        boss.transitioning = true;
        boss.hazard.active = true;
        let id = boss.id;
        h.store.install(boss);

        h.engine.begin_phase_transition(id, Phase::First).await;

        let after = h.store.snapshot().expect("still installed");
        assert_eq!(after.phase, Phase::Second);
        assert_eq!(after.max_health, 2500);
        assert_eq!(after.current_health, 2500);
        assert_eq!(after.base_damage, 65);
        assert!(!after.hazard.active);
        assert!(!after.transitioning);
        assert!(h.announcer.saw("rises again"));
    }

    #[tokio::test(start_paused = true)]
    async fn phase_transition_aborts_if_the_encounter_was_cleared() {
        let h = harness(Config::default());
        let mut boss = BossEncounter::from_template(&template(), 0.0);
        boss.current_health = 0;
        boss.transitioning = true;
        let id = boss.id;
        h.store.install(boss);
        h.store.clear_if(id);

        h.engine.begin_phase_transition(id, Phase::First).await;

        assert!(h.store.snapshot().is_none());
        assert!(h.announcer.posts().is_empty());
    }

    #[tokio::test]
    async fn counter_hazard_freezes_and_charges_energy() {
        let mut config = Config::default();
        config.freeze.energy_cost = 100;
        let h = harness(config);
        h.profiles.insert(ALICE, MemoryProfiles::standard_profile(25));
        h.store.install(BossEncounter::from_template(&template(), 0.0));

        let duration = h.engine.trigger_counter_hazard(ALICE).await.expect("freezes");
        assert_eq!(duration, Duration::from_secs(120));
        assert!(h.store.snapshot().expect("live").is_frozen(Instant::now()));
        assert_eq!(h.profiles.fetch(ALICE).await.expect("ok").energy, 300);
        assert!(h.announcer.saw("frozen"));
    }

    #[tokio::test]
    async fn second_freeze_is_rejected_while_one_holds() {
        let h = harness(Config::default());
        h.profiles.insert(ALICE, MemoryProfiles::standard_profile(25));
        h.profiles.insert(BOB, MemoryProfiles::standard_profile(25));
        h.store.install(BossEncounter::from_template(&template(), 0.0));

        h.engine.trigger_counter_hazard(ALICE).await.expect("first freezes");
        let err = h
            .engine
            .trigger_counter_hazard(BOB)
            .await
            .expect_err("second must be rejected");
        assert!(matches!(err, CombatError::AlreadyFrozen { .. }));
    }

    #[tokio::test]
    async fn short_energy_unwinds_the_freeze_claim() {
        let mut config = Config::default();
        config.freeze.energy_cost = 500;
        let h = harness(config);
        h.profiles.insert(ALICE, MemoryProfiles::standard_profile(25));
        h.store.install(BossEncounter::from_template(&template(), 0.0));

        let err = h
            .engine
            .trigger_counter_hazard(ALICE)
            .await
            .expect_err("energy is short");
        assert!(matches!(
            err,
            CombatError::InsufficientResource {
                required: 500,
                available: 400
            }
        ));
        // The claim was rolled back; nothing is frozen.
        assert!(!h.store.snapshot().expect("live").is_frozen(Instant::now()));
    }

    #[tokio::test]
    async fn counter_hazard_requires_a_technique() {
        let h = harness(Config::default());
        let mut profile = MemoryProfiles::standard_profile(25);
        profile.loadout.remove(&AbilityCategory::Technique);
        h.profiles.insert(ALICE, profile);
        h.store.install(BossEncounter::from_template(&template(), 0.0));

        let err = h
            .engine
            .trigger_counter_hazard(ALICE)
            .await
            .expect_err("no technique equipped");
        assert!(matches!(err, CombatError::NoItemEquipped { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn a_certain_clash_shatters_the_freeze_early() {
        let mut config = Config::default();
        config.freeze.clash_chance = 1.0;
        config.freeze.clash_interval = Duration::from_secs(10);
        let h = harness(config);
        h.profiles.insert(ALICE, MemoryProfiles::standard_profile(25));
        h.store.install(BossEncounter::from_template(&template(), 0.0));

        h.engine.trigger_counter_hazard(ALICE).await.expect("freezes");
        // Let the clash watcher register its timer first.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;

        assert!(!h.store.snapshot().expect("live").is_frozen(Instant::now()));
        assert!(h.announcer.saw("shatters"));
    }

    #[tokio::test(start_paused = true)]
    async fn an_impossible_clash_lets_the_freeze_run_its_course() {
        let mut config = Config::default();
        config.freeze.clash_chance = 0.0;
        config.freeze.duration = Duration::from_secs(120);
        let h = harness(config);
        h.profiles.insert(ALICE, MemoryProfiles::standard_profile(25));
        h.store.install(BossEncounter::from_template(&template(), 0.0));

        h.engine.trigger_counter_hazard(ALICE).await.expect("freezes");
        tokio::time::advance(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert!(h.store.snapshot().expect("live").is_frozen(Instant::now()));

        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        assert!(!h.store.snapshot().expect("live").is_frozen(Instant::now()));
        assert!(!h.announcer.saw("shatters"));
    }
}
