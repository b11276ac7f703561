//! Observability: logging and metrics for the encounter coordinator.

pub mod logging;
pub mod metrics;

pub use logging::{LogFormat, init_logging};
