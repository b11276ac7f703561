//! `raidwarden` - shared world-boss encounter coordinator
//!
//! A persistent cooperative boss fight for many concurrent participants:
//! exactly-once spawning behind a check-and-set lock, per-key rate-limited
//! combat resolution, boss retaliation with phases and a one-shot hazard,
//! a bounded attacker roster with incapacitation lockouts, and a
//! session-token-cancelled idle-despawn monitor.

pub mod cli;
pub mod combat;
pub mod config;
pub mod encounter;
pub mod engine;
pub mod error;
pub mod external;
pub mod observability;
pub mod roster;
pub mod service;
pub mod spawn;

pub use service::WardenService;
