//! Error types for `raidwarden`.
//!
//! Combat rejections are ordinary values reported back to the acting
//! participant; only configuration, I/O, and collaborator failures are
//! process-level errors.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::external::{AbilityCategory, ParticipantId};

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `raidwarden` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `raidwarden` operations.
///
/// Aggregates domain-specific errors and maps each to an exit code.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Combat rejection that escaped to the CLI (simulation driver)
    #[error(transparent)]
    Combat(#[from] CombatError),

    /// External collaborator failure
    #[error(transparent)]
    External(#[from] ExternalError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WardenError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Combat(_) | Self::External(_) => ExitCode::ERROR,
        }
    }
}

// ============================================================================
// Combat Rejections
// ============================================================================

/// Reasons an ability use or counter-hazard attempt is rejected.
///
/// A rejected action has no side effects: no health, energy, cooldown, or
/// roster state is mutated when one of these is returned. Each variant's
/// message is suitable for relaying directly to the acting participant.
#[derive(Debug, Error)]
pub enum CombatError {
    /// No encounter is live, or the boss is already at zero health.
    #[error("there is no active encounter to fight")]
    NoActiveEncounter,

    /// Attacker capacity reached; the participant could not claim a slot.
    #[error("the battlefield is full ({capacity} attackers engaged)")]
    RosterFull {
        /// Configured roster capacity.
        capacity: usize,
    },

    /// Nothing equipped in the requested ability category.
    #[error("no {category} equipped")]
    NoItemEquipped {
        /// The category the participant tried to use.
        category: AbilityCategory,
    },

    /// The equipped item has no move with that number.
    #[error("{item} has no move {number}")]
    UnknownMove {
        /// Equipped item name.
        item: String,
        /// Requested move number.
        number: u8,
    },

    /// Not enough energy to pay the move's cost.
    #[error("insufficient energy: need {required}, have {available}")]
    InsufficientResource {
        /// Energy cost of the move.
        required: u32,
        /// Energy the participant currently has.
        available: u32,
    },

    /// The `(item, move)` pair was used too recently.
    #[error("that move is on cooldown for another {}s", remaining.as_secs().max(1))]
    OnCooldown {
        /// Time until the cooldown expires.
        remaining: Duration,
    },

    /// A counter-hazard freeze is already in effect.
    #[error("the encounter is already frozen for another {}s", remaining.as_secs().max(1))]
    AlreadyFrozen {
        /// Time until the current freeze expires.
        remaining: Duration,
    },

    /// The participant is defeated and locked out of acting.
    #[error("you are incapacitated and cannot act yet")]
    Incapacitated,

    /// Collaborator failure (profile store, move library).
    #[error(transparent)]
    External(#[from] ExternalError),
}

// ============================================================================
// External Collaborator Errors
// ============================================================================

/// Failures reported by external collaborators.
#[derive(Debug, Error)]
pub enum ExternalError {
    /// The profile store has no record for this participant.
    #[error("no profile found for participant {0}")]
    UnknownParticipant(ParticipantId),

    /// The collaborator could not be reached or refused the operation.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// YAML parsing failed.
    #[error("parse error in {path}: {source}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Error from the YAML parser.
        source: serde_yaml::Error,
    },

    /// A field has an invalid value.
    #[error("invalid value for '{field}': {message}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// Description of what is wrong.
        message: String,
    },

    /// A duration string could not be parsed.
    #[error("invalid duration for '{field}': {message}")]
    BadDuration {
        /// Dotted path of the offending field.
        field: String,
        /// Error from the duration parser.
        message: String,
    },
}

/// Result type alias for `raidwarden` operations.
pub type Result<T> = std::result::Result<T, WardenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_maps_to_config_exit_code() {
        let err: WardenError = ConfigError::Invalid {
            field: "roster.capacity".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn io_error_maps_to_io_exit_code() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: WardenError = io.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn combat_rejection_messages_name_the_cause() {
        let err = CombatError::RosterFull { capacity: 23 };
        assert!(err.to_string().contains("23"));

        let err = CombatError::UnknownMove {
            item: "Ashfang Blade".to_string(),
            number: 4,
        };
        assert!(err.to_string().contains("Ashfang Blade"));
        assert!(err.to_string().contains('4'));
    }

    #[test]
    fn cooldown_message_rounds_up_to_a_second() {
        let err = CombatError::OnCooldown {
            remaining: Duration::from_millis(250),
        };
        assert!(err.to_string().contains("1s"));
    }
}
