//! Combat resolution: one participant's ability use, validated and applied.
//!
//! The pipeline validates in rejection order (encounter, slot, equipment,
//! move, cooldown, energy) before touching the boss. The cooldown is
//! claimed before the energy spend; a spend that comes up short unwinds
//! the claim, so a rejected action leaves no rate-limit residue. The
//! damage write and the decision about what follows it (retaliation,
//! hazard, phase collapse, victory) happen inside a single store update
//! so concurrent attacks each see a consistent before/after.

use std::sync::Arc;

use rand::Rng;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::Config;
use crate::encounter::{EncounterStore, Phase};
use crate::engine::{RetaliationEngine, scaled, vary};
use crate::error::CombatError;
use crate::external::{AbilityCategory, Announcer, EnergySpend, MoveLibrary, ParticipantId, ProfileStore};
use crate::observability::metrics;
use crate::roster::{CooldownKey, Participant, Roster};

// ============================================================================
// Outcome
// ============================================================================

/// What an accepted attack did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackOutcome {
    /// Display name of the move used.
    pub move_title: String,
    /// Damage dealt after variance, criticals, and hazard penalty.
    pub damage: u32,
    /// Whether the hit was critical (rolled or guaranteed).
    pub critical: bool,
    /// Boss health after the hit.
    pub boss_health: u32,
    /// What the hit set in motion.
    pub aftermath: Aftermath,
}

/// The boss-side consequence of an accepted attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aftermath {
    /// The boss will counter after the narrative delay.
    Retaliation,
    /// Health fell to or below the hazard threshold with a charge left;
    /// the domain unleashes.
    HazardUnleashed,
    /// Health hit zero in a non-final phase; resurrection is pending.
    PhaseCollapse,
    /// Health hit zero in the final phase; the encounter is over.
    Victory,
    /// The boss is frozen; nothing follows.
    Quiet,
}

// What the guarded store update decided, before any announcement.
enum Applied {
    Retaliate,
    Hazard,
    Collapse(Phase),
    Defeated,
    Frozen,
}

// ============================================================================
// CombatResolver
// ============================================================================

/// Resolves inbound ability uses against the live encounter.
pub struct CombatResolver {
    store: Arc<EncounterStore>,
    roster: Arc<Roster>,
    profiles: Arc<dyn ProfileStore>,
    moves: Arc<dyn MoveLibrary>,
    announcer: Arc<dyn Announcer>,
    engine: Arc<RetaliationEngine>,
    config: Arc<Config>,
}

impl CombatResolver {
    /// Wires the resolver to its collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<EncounterStore>,
        roster: Arc<Roster>,
        profiles: Arc<dyn ProfileStore>,
        moves: Arc<dyn MoveLibrary>,
        announcer: Arc<dyn Announcer>,
        engine: Arc<RetaliationEngine>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            roster,
            profiles,
            moves,
            announcer,
            engine,
            config,
        }
    }

    /// Validates and applies one ability use.
    ///
    /// # Errors
    ///
    /// Returns a [`CombatError`] naming the first failed check; rejected
    /// actions mutate no health, energy, or cooldown state. Claiming a
    /// roster slot is the one exception: engagement persists even when a
    /// later check rejects the action.
    pub async fn resolve_attack(
        &self,
        id: ParticipantId,
        category: AbilityCategory,
        move_number: u8,
    ) -> Result<AttackOutcome, CombatError> {
        let boss = self
            .store
            .snapshot()
            .filter(|b| b.current_health > 0)
            .ok_or(CombatError::NoActiveEncounter)?;

        let participant = self.engage(id).await?;

        let item = participant
            .loadout
            .get(&category)
            .cloned()
            .ok_or(CombatError::NoItemEquipped { category })?;
        let move_def = self
            .moves
            .resolve(&item, move_number)
            .await
            .map_err(CombatError::from)?
            .ok_or_else(|| CombatError::UnknownMove {
                item: item.clone(),
                number: move_number,
            })?;

        let now = Instant::now();
        let hazard_bites = boss.hazard.active && !boss.is_frozen(now);

        // Cooldown first, energy second: the cooldown claim is atomic per
        // key and cheap to unwind, the energy spend is not.
        let key = CooldownKey {
            participant: id,
            item,
            move_number,
        };
        let mut cooldown = move_def.cooldown;
        if hazard_bites {
            cooldown = cooldown.mul_f64(self.config.hazard.cooldown_penalty);
        }
        self.roster
            .try_begin_cooldown(key.clone(), now, cooldown)
            .map_err(|remaining| CombatError::OnCooldown { remaining })?;

        if category.consumes_energy() && move_def.energy_cost > 0 {
            match self.profiles.try_spend_energy(id, move_def.energy_cost).await {
                Ok(EnergySpend::Spent) => {}
                Ok(EnergySpend::Short { available }) => {
                    self.roster.clear_cooldown(&key);
                    return Err(CombatError::InsufficientResource {
                        required: move_def.energy_cost,
                        available,
                    });
                }
                Err(err) => {
                    self.roster.clear_cooldown(&key);
                    return Err(err.into());
                }
            }
        }

        // Past this point the action is accepted; all that remains is
        // rolling damage and applying it.
        let guaranteed = self
            .roster
            .consume_guaranteed_crit(id, self.config.roster.streak_threshold);
        let (damage, critical) = {
            let mut rng = rand::rng();
            let raw = participant.attack.saturating_add(move_def.damage);
            let mut damage = vary(raw, self.config.combat.variance, &mut rng);
            let critical = guaranteed || rng.random_bool(self.config.combat.crit_chance);
            if critical {
                damage = scaled(damage, self.config.combat.crit_multiplier);
            }
            if hazard_bites {
                damage = scaled(damage, 1.0 - self.config.hazard.damage_penalty);
            }
            (damage, critical)
        };

        let encounter_id = boss.id;
        let hazard_floor = self.config.hazard.threshold;
        let applied = self
            .store
            .update(|b| {
                if b.id != encounter_id || b.current_health == 0 {
                    return None;
                }
                let threshold = b.hazard_threshold_health(hazard_floor);
                let after = b.apply_damage(damage);
                if after == 0 {
                    // A killing blow cannot end a non-final phase while a
                    // hazard charge remains: the boss survives at 1 health
                    // and unleashes instead.
                    if !b.in_final_phase() && b.hazard.uses_remaining > 0 {
                        b.current_health = 1;
                        b.hazard.uses_remaining -= 1;
                        b.hazard.active = true;
                        b.frozen_until = None;
                        return Some((Applied::Hazard, 1));
                    }
                    b.frozen_until = None;
                    if b.in_final_phase() {
                        return Some((Applied::Defeated, after));
                    }
                    b.transitioning = true;
                    return Some((Applied::Collapse(b.phase), after));
                }
                if b.is_frozen(Instant::now()) {
                    return Some((Applied::Frozen, after));
                }
                if after <= threshold && b.hazard.uses_remaining > 0 {
                    b.hazard.uses_remaining -= 1;
                    b.hazard.active = true;
                    return Some((Applied::Hazard, after));
                }
                Some((Applied::Retaliate, after))
            })
            .flatten();
        let Some((applied, boss_health)) = applied else {
            // The encounter vanished between the snapshot and the write.
            self.roster.clear_cooldown(&key);
            if category.consumes_energy() && move_def.energy_cost > 0 {
                if let Err(err) = self.profiles.refund_energy(id, move_def.energy_cost).await {
                    tracing::warn!(participant = %id, error = %err, "energy refund failed");
                }
            }
            return Err(CombatError::NoActiveEncounter);
        };

        self.store.touch();
        metrics::record_attack(damage, critical);
        tracing::debug!(
            participant = %id,
            move_title = %move_def.title,
            damage,
            critical,
            boss_health,
            "attack resolved"
        );

        let crit_mark = if critical { " A black flash!" } else { "" };
        self.announcer
            .post(&format!(
                "{id} strikes {} with {} for {damage} damage!{crit_mark} ({boss_health} health left)",
                boss.name, move_def.title,
            ))
            .await;

        let aftermath = self.dispatch_aftermath(encounter_id, &boss.name, applied).await;

        Ok(AttackOutcome {
            move_title: move_def.title,
            damage,
            critical,
            boss_health,
            aftermath,
        })
    }

    /// Looks up or admits the acting participant.
    async fn engage(&self, id: ParticipantId) -> Result<Participant, CombatError> {
        if let Some(engaged) = self.roster.get(id) {
            return Ok(engaged);
        }
        let profile = self.profiles.fetch(id).await.map_err(CombatError::from)?;
        if profile.health == 0 {
            return Err(CombatError::Incapacitated);
        }
        let participant = Participant::from_profile(id, &profile);
        self.roster.admit(participant.clone())?;
        metrics::set_roster_size(self.roster.len());
        tracing::debug!(participant = %id, engaged = self.roster.len(), "joined the battle");
        Ok(participant)
    }

    /// Kicks off whatever the accepted hit set in motion.
    async fn dispatch_aftermath(
        &self,
        encounter_id: Uuid,
        boss_name: &str,
        applied: Applied,
    ) -> Aftermath {
        match applied {
            Applied::Retaliate => {
                let engine = Arc::clone(&self.engine);
                tokio::spawn(async move {
                    engine.retaliate_after_delay(encounter_id).await;
                });
                Aftermath::Retaliation
            }
            Applied::Hazard => {
                let engine = Arc::clone(&self.engine);
                tokio::spawn(async move {
                    engine.unleash_hazard(encounter_id).await;
                });
                Aftermath::HazardUnleashed
            }
            Applied::Collapse(from) => {
                self.announcer
                    .post(&format!("{boss_name} collapses... but something stirs."))
                    .await;
                let engine = Arc::clone(&self.engine);
                tokio::spawn(async move {
                    engine.begin_phase_transition(encounter_id, from).await;
                });
                Aftermath::PhaseCollapse
            }
            Applied::Defeated => {
                self.finish_victory(encounter_id, boss_name).await;
                Aftermath::Victory
            }
            Applied::Frozen => Aftermath::Quiet,
        }
    }

    async fn finish_victory(&self, encounter_id: Uuid, boss_name: &str) {
        if self.store.clear_if(encounter_id).is_none() {
            return;
        }
        self.roster.clear();
        metrics::set_roster_size(0);
        metrics::record_despawn("victory");
        tracing::info!(boss = %boss_name, "encounter won");
        self.announcer
            .post(&format!("{boss_name} has been defeated! The battlefield clears."))
            .await;
    }
}

impl std::fmt::Debug for CombatResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatResolver").finish_non_exhaustive()
    }
}
