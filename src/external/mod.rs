//! Seams to external collaborators.
//!
//! The coordinator does not own participant profiles, move definitions, or
//! the messaging channel; it consumes them through the traits here. All
//! participant health and energy mutations flow through the
//! [`ProfileStore`] as deltas so the owning system stays authoritative.

pub mod memory;

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExternalError;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque participant identity (the chat platform's user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ability categories a loadout maps to equipped items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbilityCategory {
    /// Innate technique; the only category that consumes energy.
    Technique,
    /// Equipped weapon.
    Weapon,
    /// Fighting style.
    Style,
}

impl AbilityCategory {
    /// Whether moves in this category draw from the energy pool.
    #[must_use]
    pub const fn consumes_energy(self) -> bool {
        matches!(self, Self::Technique)
    }
}

impl std::fmt::Display for AbilityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Technique => "technique",
            Self::Weapon => "weapon",
            Self::Style => "fighting style",
        };
        write!(f, "{label}")
    }
}

// ============================================================================
// Collaborator data
// ============================================================================

/// A participant's persisted profile, as reported by the profile store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Current energy pool.
    pub energy: u32,
    /// Flat damage stat added to every move's base damage.
    pub attack: u32,
    /// Equipped item per ability category.
    pub loadout: HashMap<AbilityCategory, String>,
}

/// One move of an equipped item, keyed externally by `(item, move number)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveDef {
    /// Display name of the move.
    pub title: String,
    /// Base damage before the participant's attack stat.
    pub damage: u32,
    /// Energy cost; only charged for energy-consuming categories.
    pub energy_cost: u32,
    /// Base cooldown before the same move may be reused.
    pub cooldown: Duration,
}

/// Result of an atomic conditional energy spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergySpend {
    /// The full cost was deducted.
    Spent,
    /// The pool was short; nothing was deducted.
    Short {
        /// Energy available at the time of the attempt.
        available: u32,
    },
}

// ============================================================================
// Traits
// ============================================================================

/// Persisted participant profiles, owned by an external system.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetches the current profile for a participant.
    async fn fetch(&self, id: ParticipantId) -> Result<PlayerProfile, ExternalError>;

    /// Applies a signed health delta, clamped at zero and at the profile's
    /// maximum. Returns the health after the delta.
    async fn apply_health_delta(
        &self,
        id: ParticipantId,
        delta: i64,
    ) -> Result<u32, ExternalError>;

    /// Sets health to an absolute value (lockout recovery).
    async fn set_health(&self, id: ParticipantId, value: u32) -> Result<(), ExternalError>;

    /// Atomically deducts `cost` energy if the pool covers it.
    async fn try_spend_energy(
        &self,
        id: ParticipantId,
        cost: u32,
    ) -> Result<EnergySpend, ExternalError>;

    /// Returns previously spent energy (used to unwind a lost race).
    async fn refund_energy(&self, id: ParticipantId, amount: u32) -> Result<(), ExternalError>;
}

/// Ability and move definitions, owned by an external system.
#[async_trait::async_trait]
pub trait MoveLibrary: Send + Sync {
    /// Resolves the move definition for `(item, move_number)`, or `None`
    /// if the item has no such move.
    async fn resolve(
        &self,
        item: &str,
        move_number: u8,
    ) -> Result<Option<MoveDef>, ExternalError>;
}

/// The announcement channel and its moderation controls.
///
/// Announcing is fire-and-forget: a failed post must never abort combat
/// resolution, so implementations log failures instead of returning them.
#[async_trait::async_trait]
pub trait Announcer: Send + Sync {
    /// Posts a broadcast message to the encounter's shared space.
    async fn post(&self, text: &str);

    /// Revokes a participant's ability to act in the shared space.
    async fn revoke_voice(&self, id: ParticipantId, duration: Duration);

    /// Restores a previously revoked participant.
    async fn restore_voice(&self, id: ParticipantId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_techniques_consume_energy() {
        assert!(AbilityCategory::Technique.consumes_energy());
        assert!(!AbilityCategory::Weapon.consumes_energy());
        assert!(!AbilityCategory::Style.consumes_energy());
    }

    #[test]
    fn category_serde_is_lowercase() {
        let json = serde_json::to_string(&AbilityCategory::Weapon).expect("serializes");
        assert_eq!(json, "\"weapon\"");
    }

    #[test]
    fn participant_id_displays_raw_number() {
        assert_eq!(ParticipantId(42).to_string(), "42");
    }
}
