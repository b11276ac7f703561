//! Property tests over the encounter data model and rate limiting.

use std::time::Duration;

use proptest::prelude::*;

use raidwarden::config::Config;
use raidwarden::config::schema::{BossTemplate, HazardTemplate};
use raidwarden::encounter::{BossEncounter, Phase, health_bar};
use raidwarden::external::ParticipantId;
use raidwarden::roster::{CooldownKey, Roster};

fn template(max_health: u32, base_damage: u32) -> BossTemplate {
    BossTemplate {
        name: "Hollow Sovereign".to_string(),
        max_health,
        base_damage,
        phase_count: 2,
        moves: vec![],
        hazard: HazardTemplate::default(),
    }
}

proptest! {
    #[test]
    fn health_never_goes_negative_and_only_decreases(
        max_health in 1u32..1_000_000,
        hits in prop::collection::vec(0u32..100_000, 0..64),
    ) {
        let mut boss = BossEncounter::from_template(&template(max_health, 50), 0.0);
        let mut previous = boss.current_health;
        for hit in hits {
            let after = boss.apply_damage(hit);
            prop_assert!(after <= previous, "health must be monotone within a phase");
            prop_assert!(after <= boss.max_health);
            previous = after;
        }
    }

    #[test]
    fn the_spawn_buff_scales_base_damage_within_its_range(
        base_damage in 1u32..10_000,
        buff_pct in 0u8..=50,
    ) {
        let buff = f64::from(buff_pct) / 100.0;
        let boss = BossEncounter::from_template(&template(1000, base_damage), buff);
        let lo = base_damage;
        let hi = (f64::from(base_damage) * 1.5).ceil() as u32 + 1;
        prop_assert!(boss.base_damage >= lo && boss.base_damage <= hi);
    }

    #[test]
    fn the_health_bar_is_always_twenty_segments(
        current in 0u32..2_000_000,
        max in 0u32..1_000_000,
    ) {
        let bar = health_bar(current.min(max), max);
        prop_assert_eq!(bar.chars().count(), 20);
        let filled = bar.matches('█').count();
        if max > 0 && current >= max {
            prop_assert_eq!(filled, 20);
        }
    }

    #[test]
    fn a_cooldown_window_admits_exactly_one_use(
        cooldown_secs in 1u64..600,
        attempts in 2usize..16,
    ) {
        let roster = Roster::new(Config::default().roster.capacity);
        let now = tokio::time::Instant::now();
        let duration = Duration::from_secs(cooldown_secs);
        let mut accepted = 0;
        for _ in 0..attempts {
            let key = CooldownKey {
                participant: ParticipantId(1),
                item: "Ashfang Blade".to_string(),
                move_number: 1,
            };
            if roster.try_begin_cooldown(key, now, duration).is_ok() {
                accepted += 1;
            }
        }
        prop_assert_eq!(accepted, 1);
    }

    #[test]
    fn phase_ladders_are_monotone(count in 0u8..=8) {
        let final_phase = Phase::final_for_count(count);
        let mut phase = Phase::First;
        while let Some(next) = phase.next() {
            prop_assert!(next > phase);
            phase = next;
        }
        prop_assert!(final_phase <= Phase::Third);
    }
}
