//! Shared integration-test harness: a fully wired [`WardenService`]
//! against the in-memory collaborators, with deterministic combat rolls.

#![allow(dead_code)]

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use raidwarden::WardenService;
use raidwarden::config::Config;
use raidwarden::config::schema::{BossTemplate, HazardTemplate};
use raidwarden::external::memory::{MemoryProfiles, RecordingAnnouncer, StaticMoves};
use raidwarden::external::{Announcer, ParticipantId, ProfileStore};

pub const ALICE: ParticipantId = ParticipantId(1);
pub const BOB: ParticipantId = ParticipantId(2);
pub const CAROL: ParticipantId = ParticipantId(3);

/// Everything a test needs to drive and observe the coordinator.
pub struct TestWorld {
    pub service: Arc<WardenService>,
    pub profiles: Arc<MemoryProfiles>,
    pub announcer: Arc<RecordingAnnouncer>,
}

/// The default single-template pool: 1000 health, 50 base damage, two
/// phases, one hazard charge at 120 damage.
pub fn boss_template() -> BossTemplate {
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

/// Builds a world with deterministic rolls (no variance, no random
/// crits, no spawn buff) and the standard move kit. `tweak` runs last
/// and may override any of that.
pub fn world(tweak: impl FnOnce(&mut Config)) -> TestWorld {
    world_with_moves(tweak, StaticMoves::standard_kit())
}

/// Like [`world`], with a custom move library.
pub fn world_with_moves(tweak: impl FnOnce(&mut Config), moves: StaticMoves) -> TestWorld {
    let mut config = Config::default();
    config.combat.variance = 0.0;
    config.combat.crit_chance = 0.0;
    config.spawn.buff_min_pct = 0;
    config.spawn.buff_max_pct = 0;
    config.bosses.push(boss_template());
    tweak(&mut config);

    let profiles = Arc::new(MemoryProfiles::new());
    let announcer = Arc::new(RecordingAnnouncer::new());
    let service = Arc::new(WardenService::new(
        Arc::new(config),
        Arc::clone(&profiles) as Arc<dyn ProfileStore>,
        Arc::new(moves),
        Arc::clone(&announcer) as Arc<dyn Announcer>,
        CancellationToken::new(),
    ));
    TestWorld {
        service,
        profiles,
        announcer,
    }
}

/// Seeds a participant with the standard loadout and the given stats.
pub fn seed(world: &TestWorld, id: ParticipantId, attack: u32, health: u32) {
    let mut profile = MemoryProfiles::standard_profile(attack);
    profile.max_health = profile.max_health.max(health);
    profile.health = health;
    world.profiles.insert(id, profile);
}
