//! Bounded attacker roster with per-key cooldowns and near-death streaks.
//!
//! Membership is capacity-bounded: a slot is reserved with a CAS on the
//! occupancy counter before the member is inserted, so the bound holds
//! under concurrent admissions. Cooldowns are checked-and-set through the
//! `DashMap` entry API, which holds the shard lock for the whole
//! read-decide-write, making each `(participant, item, move)` key a
//! single-winner race.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use crate::error::CombatError;
use crate::external::{AbilityCategory, ParticipantId, PlayerProfile};

// ============================================================================
// Participant
// ============================================================================

/// An engaged attacker's roster-local state.
///
/// Health here mirrors the external profile; every delta applied to the
/// mirror is also forwarded to the profile store by the caller.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Identity.
    pub id: ParticipantId,
    /// Mirrored current health.
    pub current_health: u32,
    /// Mirrored maximum health.
    pub max_health: u32,
    /// Flat damage stat.
    pub attack: u32,
    /// Equipped item per ability category.
    pub loadout: HashMap<AbilityCategory, String>,
}

impl Participant {
    /// Builds roster state from a fetched profile.
    #[must_use]
    pub fn from_profile(id: ParticipantId, profile: &PlayerProfile) -> Self {
        Self {
            id,
            current_health: profile.health,
            max_health: profile.max_health,
            attack: profile.attack,
            loadout: profile.loadout.clone(),
        }
    }
}

/// Cooldown key: one rate-limit bucket per participant, item, and move.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CooldownKey {
    /// Acting participant.
    pub participant: ParticipantId,
    /// Equipped item name.
    pub item: String,
    /// Move number within the item.
    pub move_number: u8,
}

// ============================================================================
// Roster
// ============================================================================

/// Bounded set of engaged attackers plus their rate-limit state.
pub struct Roster {
    capacity: usize,
    members: DashMap<ParticipantId, Participant>,
    occupancy: AtomicUsize,
    cooldowns: DashMap<CooldownKey, Instant>,
    streaks: DashMap<ParticipantId, u32>,
}

impl Roster {
    /// Creates an empty roster with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            members: DashMap::new(),
            occupancy: AtomicUsize::new(0),
            cooldowns: DashMap::new(),
            streaks: DashMap::new(),
        }
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current engaged count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occupancy.load(Ordering::SeqCst)
    }

    /// Whether nobody is engaged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the participant currently holds a slot.
    #[must_use]
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.members.contains_key(&id)
    }

    /// Clones the participant's roster state, if engaged.
    #[must_use]
    pub fn get(&self, id: ParticipantId) -> Option<Participant> {
        self.members.get(&id).map(|p| p.clone())
    }

    /// Admits a participant, claiming a capacity slot.
    ///
    /// Admitting an already-engaged participant is a no-op. The slot is
    /// reserved via CAS on the occupancy counter before insertion, and the
    /// vacant-entry shard lock prevents the same id claiming two slots.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::RosterFull`] when every slot is taken.
    pub fn admit(&self, participant: Participant) -> Result<(), CombatError> {
        match self.members.entry(participant.id) {
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                let reserved = self
                    .occupancy
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                        (n < self.capacity).then_some(n + 1)
                    });
                if reserved.is_err() {
                    return Err(CombatError::RosterFull {
                        capacity: self.capacity,
                    });
                }
                slot.insert(participant);
                Ok(())
            }
        }
    }

    /// Removes a participant, freeing their slot immediately.
    pub fn remove(&self, id: ParticipantId) -> Option<Participant> {
        let removed = self.members.remove(&id).map(|(_, p)| p);
        if removed.is_some() {
            self.occupancy.fetch_sub(1, Ordering::SeqCst);
        }
        removed
    }

    /// Snapshot of every engaged participant at this instant.
    ///
    /// Aggregate actions (retaliation, hazard) iterate this snapshot;
    /// participants admitted afterwards are unaffected by that action.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Participant> {
        self.members.iter().map(|p| p.clone()).collect()
    }

    /// Applies damage to an engaged participant's health mirror, clamped
    /// at zero. Returns the health afterwards, or `None` if the
    /// participant is no longer engaged.
    pub fn apply_damage(&self, id: ParticipantId, amount: u32) -> Option<u32> {
        let mut member = self.members.get_mut(&id)?;
        member.current_health = member.current_health.saturating_sub(amount);
        Some(member.current_health)
    }

    // ------------------------------------------------------------------
    // Cooldowns
    // ------------------------------------------------------------------

    /// Atomic check-and-set on a cooldown key.
    ///
    /// If the key's cooldown has expired (or was never set), a new expiry
    /// of `now + duration` is written and `Ok` returned. Otherwise the
    /// remaining wait is returned and nothing is written. Two concurrent
    /// calls for the same key serialize on the shard lock; at most one
    /// can pass within a cooldown window.
    ///
    /// # Errors
    ///
    /// Returns the remaining cooldown as `Err` when the key is still hot.
    pub fn try_begin_cooldown(
        &self,
        key: CooldownKey,
        now: Instant,
        duration: Duration,
    ) -> Result<(), Duration> {
        match self.cooldowns.entry(key) {
            Entry::Occupied(mut entry) => {
                let expiry = *entry.get();
                if expiry > now {
                    Err(expiry - now)
                } else {
                    entry.insert(now + duration);
                    Ok(())
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now + duration);
                Ok(())
            }
        }
    }

    /// Removes a cooldown entry (unwinding a rejected action that had
    /// already claimed its cooldown slot).
    pub fn clear_cooldown(&self, key: &CooldownKey) {
        self.cooldowns.remove(key);
    }

    // ------------------------------------------------------------------
    // Near-death streaks
    // ------------------------------------------------------------------

    /// Increments the participant's defeat streak, returning the new value.
    pub fn record_defeat(&self, id: ParticipantId) -> u32 {
        let mut streak = self.streaks.entry(id).or_insert(0);
        *streak += 1;
        *streak
    }

    /// Consumes a guaranteed critical if the streak has reached the
    /// threshold: returns `true` and resets the streak to zero, atomically
    /// per participant.
    pub fn consume_guaranteed_crit(&self, id: ParticipantId, threshold: u32) -> bool {
        match self.streaks.entry(id) {
            Entry::Occupied(mut entry) => {
                if *entry.get() >= threshold {
                    entry.insert(0);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Current streak value (for status displays and tests).
    #[must_use]
    pub fn streak(&self, id: ParticipantId) -> u32 {
        self.streaks.get(&id).map_or(0, |s| *s)
    }

    // ------------------------------------------------------------------
    // Encounter end
    // ------------------------------------------------------------------

    /// Clears all per-encounter state when the encounter ends.
    pub fn clear(&self) {
        self.members.clear();
        self.occupancy.store(0, Ordering::SeqCst);
        self.cooldowns.clear();
        self.streaks.clear();
    }
}

impl std::fmt::Debug for Roster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Roster")
            .field("capacity", &self.capacity)
            .field("engaged", &self.len())
            .finish_non_exhaustive()
    }
}
