//! The boss encounter: data model and shared store.

pub mod boss;
pub mod store;

pub use boss::{BossEncounter, EncounterStatus, HazardState, Phase, health_bar};
pub use store::{EncounterStore, SpawnGuard};
