//! The boss encounter record and its derived status view.

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::schema::BossTemplate;

// ============================================================================
// Phase
// ============================================================================

/// Encounter phase ladder. Advancement is one-way: a boss never returns to
/// an earlier phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Initial phase.
    First,
    /// Entered after the first resurrection.
    Second,
    /// Entered after the second resurrection.
    Third,
}

impl Phase {
    /// 1-based phase number.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
        }
    }

    /// The phase after this one, or `None` at the top of the ladder.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::First => Some(Self::Second),
            Self::Second => Some(Self::Third),
            Self::Third => None,
        }
    }

    /// Maps a configured phase count (1 to 3) to the final phase.
    #[must_use]
    pub const fn final_for_count(count: u8) -> Self {
        match count {
            0 | 1 => Self::First,
            2 => Self::Second,
            _ => Self::Third,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Phase {}", self.number())
    }
}

// ============================================================================
// Hazard
// ============================================================================

/// Hazard ("domain") state carried by a live encounter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardState {
    /// Whether the ongoing damage/cooldown penalty is in effect.
    pub active: bool,
    /// One-shot charges left for the whole encounter.
    pub uses_remaining: u8,
    /// Fixed damage dealt to every engaged participant on activation.
    pub damage: u32,
}

// ============================================================================
// BossEncounter
// ============================================================================

/// The single live encounter record.
///
/// Mutated only through [`EncounterStore::update`](super::store::EncounterStore::update)
/// so every read-modify-write happens under one short-held lock.
#[derive(Debug, Clone)]
pub struct BossEncounter {
    /// Unique id for this spawn (not the template).
    pub id: Uuid,
    /// Template display name.
    pub name: String,
    /// Health pool for the current phase.
    pub max_health: u32,
    /// Current health; never exceeds `max_health`, clamped at zero.
    pub current_health: u32,
    /// Current phase; monotonically non-decreasing.
    pub phase: Phase,
    /// The phase in which reaching zero health ends the encounter.
    pub final_phase: Phase,
    /// Retaliation base damage, amplified on each phase transition.
    pub base_damage: u32,
    /// Named abilities quoted in retaliation announcements.
    pub moves: Vec<String>,
    /// Hazard charges and penalty flag.
    pub hazard: HazardState,
    /// While set and in the future, retaliation and phase advancement are
    /// suppressed (a counter-hazard is in effect).
    pub frozen_until: Option<Instant>,
    /// True between reaching zero health in a non-final phase and the
    /// delayed resurrection completing.
    pub transitioning: bool,
    /// Wall-clock spawn time, for status displays.
    pub spawned_at: DateTime<Utc>,
}

impl BossEncounter {
    /// Instantiates a fresh encounter from a template.
    ///
    /// `damage_buff` is the per-spawn random buff as a fraction (0.12 =
    /// +12% base damage).
    #[must_use]
    pub fn from_template(template: &BossTemplate, damage_buff: f64) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let base_damage =
            (f64::from(template.base_damage) * (1.0 + damage_buff)).floor() as u32;
        Self {
            id: Uuid::new_v4(),
            name: template.name.clone(),
            max_health: template.max_health,
            current_health: template.max_health,
            phase: Phase::First,
            final_phase: Phase::final_for_count(template.phase_count),
            base_damage,
            moves: template.moves.clone(),
            hazard: HazardState {
                active: false,
                uses_remaining: template.hazard.uses,
                damage: template.hazard.damage,
            },
            frozen_until: None,
            transitioning: false,
            spawned_at: Utc::now(),
        }
    }

    /// Whether a counter-hazard freeze is currently in effect.
    #[must_use]
    pub fn is_frozen(&self, now: Instant) -> bool {
        self.frozen_until.is_some_and(|until| until > now)
    }

    /// Whether reaching zero health in the current phase ends the encounter.
    #[must_use]
    pub fn in_final_phase(&self) -> bool {
        self.phase >= self.final_phase
    }

    /// Subtracts damage, clamping at zero. Returns the health afterwards.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        self.current_health = self.current_health.saturating_sub(amount);
        self.current_health
    }

    /// Absolute health at which the hazard threshold sits.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn hazard_threshold_health(&self, threshold: f64) -> u32 {
        (f64::from(self.max_health) * threshold).floor() as u32
    }

    /// Builds a status snapshot for external display.
    #[must_use]
    pub fn status(&self, now: Instant, engaged: usize, capacity: usize) -> EncounterStatus {
        EncounterStatus {
            name: self.name.clone(),
            current_health: self.current_health,
            max_health: self.max_health,
            phase: self.phase,
            hazard_active: self.hazard.active,
            frozen: self.is_frozen(now),
            engaged,
            capacity,
            spawned_at: self.spawned_at,
        }
    }
}

// ============================================================================
// Status view
// ============================================================================

/// Read-only snapshot of a live encounter for status displays.
#[derive(Debug, Clone)]
pub struct EncounterStatus {
    /// Boss name.
    pub name: String,
    /// Current health.
    pub current_health: u32,
    /// Current phase health pool.
    pub max_health: u32,
    /// Current phase.
    pub phase: Phase,
    /// Whether the hazard penalty is in effect.
    pub hazard_active: bool,
    /// Whether a counter-hazard freeze is in effect.
    pub frozen: bool,
    /// Engaged attacker count.
    pub engaged: usize,
    /// Roster capacity.
    pub capacity: usize,
    /// Wall-clock spawn time.
    pub spawned_at: DateTime<Utc>,
}

impl std::fmt::Display for EncounterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {} ({}/{}) | {}/{} engaged",
            self.name,
            self.phase,
            health_bar(self.current_health, self.max_health),
            self.current_health,
            self.max_health,
            self.engaged,
            self.capacity,
        )?;
        if self.frozen {
            write!(f, " [frozen]")?;
        }
        if self.hazard_active {
            write!(f, " [hazard]")?;
        }
        Ok(())
    }
}

/// Renders a 20-segment health bar.
#[must_use]
pub fn health_bar(current: u32, max: u32) -> String {
    const SIZE: usize = 20;
    if max == 0 {
        return "░".repeat(SIZE);
    }
    let filled = (current as usize * SIZE) / max as usize;
    let filled = filled.min(SIZE);
    format!("{}{}", "█".repeat(filled), "░".repeat(SIZE - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::HazardTemplate;

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

    #[test]
    fn phases_are_ordered_and_one_way() {
        assert!(Phase::First < Phase::Second);
        assert_eq!(Phase::First.next(), Some(Phase::Second));
        assert_eq!(Phase::Third.next(), None);
        assert_eq!(Phase::final_for_count(1), Phase::First);
        assert_eq!(Phase::final_for_count(3), Phase::Third);
    }

    #[test]
    fn from_template_applies_the_damage_buff() {
        let boss = BossEncounter::from_template(&template(), 0.10);
        assert_eq!(boss.base_damage, 55);
        assert_eq!(boss.current_health, 1000);
        assert_eq!(boss.phase, Phase::First);
        assert!(!boss.in_final_phase());
        assert!(!boss.transitioning);
    }

    #[test]
    fn damage_clamps_at_zero() {
        let mut boss = BossEncounter::from_template(&template(), 0.0);
        assert_eq!(boss.apply_damage(400), 600);
        assert_eq!(boss.apply_damage(5000), 0);
        assert_eq!(boss.current_health, 0);
    }

    #[test]
    fn hazard_threshold_is_a_fraction_of_max() {
        let boss = BossEncounter::from_template(&template(), 0.0);
        assert_eq!(boss.hazard_threshold_health(0.10), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn freeze_expires_with_time() {
        let mut boss = BossEncounter::from_template(&template(), 0.0);
        let now = Instant::now();
        assert!(!boss.is_frozen(now));

        boss.frozen_until = Some(now + std::time::Duration::from_secs(120));
        assert!(boss.is_frozen(now));

        tokio::time::advance(std::time::Duration::from_secs(121)).await;
        assert!(!boss.is_frozen(Instant::now()));
    }

    #[test]
    fn health_bar_fills_proportionally() {
        assert_eq!(health_bar(1000, 1000).matches('█').count(), 20);
        assert_eq!(health_bar(500, 1000).matches('█').count(), 10);
        assert_eq!(health_bar(0, 1000).matches('█').count(), 0);
        assert_eq!(health_bar(1, 0).matches('█').count(), 0);
    }

    #[test]
    fn status_display_mentions_flags() {
        let mut boss = BossEncounter::from_template(&template(), 0.0);
        boss.hazard.active = true;
        let status = boss.status(Instant::now(), 3, 23);
        let text = status.to_string();
        assert!(text.contains("Hollow Sovereign"));
        assert!(text.contains("3/23"));
        assert!(text.contains("[hazard]"));
    }
}
