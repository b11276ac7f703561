//! The `run` command: spawn scheduler with in-memory collaborators.
//!
//! A deployment embeds [`WardenService`] behind its own profile store and
//! messaging layer; this command runs the same service against the
//! in-memory collaborators as a local sandbox.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::RunArgs;
use crate::config::Config;
use crate::error::WardenError;
use crate::external::memory::{MemoryProfiles, StaticMoves, TracingAnnouncer};
use crate::service::WardenService;

/// Loads the given config file, or falls back to built-in defaults.
pub(crate) fn load_or_default(path: Option<&Path>) -> Result<Arc<Config>, WardenError> {
    match path {
        Some(path) => Ok(crate::config::load(path)?),
        None => Ok(Arc::new(Config::default())),
    }
}

/// Run the coordinator until interrupted.
///
/// # Errors
///
/// Returns a config error when the configuration file is unreadable or
/// invalid.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), WardenError> {
    let config = load_or_default(args.config.as_deref())?;
    if config.bosses.is_empty() {
        tracing::warn!("no boss templates configured; nothing will ever spawn");
    }

    let service = WardenService::new(
        config,
        Arc::new(MemoryProfiles::new()),
        Arc::new(StaticMoves::standard_kit()),
        Arc::new(TracingAnnouncer),
        cancel,
    );
    service.run().await;
    Ok(())
}
