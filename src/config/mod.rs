//! Configuration: schema, defaults, loading, validation.

pub mod loader;
pub mod schema;

pub use loader::{load, validate};
pub use schema::{BossTemplate, Config};
